//! 前置/后置关联矩阵 `Pre`, `Post ∈ ℕ^{|P|×|T|}` 及效应矩阵 `C = Post - Pre`。
//!
//! 矩阵按库所分行存储，每行为一个 `SmallVec`；建网期间随库所/迁移的追加而增长。
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};

type SmallRow<T> = SmallVec<[T; 8]>;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence<T> {
    rows: IndexVec<PlaceId, SmallRow<T>>,
    cols: usize,
}

impl<T> Incidence<T>
where
    T: Clone + Default,
{
    pub fn new(places: usize, transitions: usize) -> Self {
        let rows = (0..places)
            .map(|_| SmallRow::from_elem(T::default(), transitions))
            .collect();
        Self {
            rows,
            cols: transitions,
        }
    }

    pub fn push_place(&mut self) -> PlaceId {
        self.rows.push(SmallRow::from_elem(T::default(), self.cols))
    }

    pub fn push_transition(&mut self) -> TransitionId {
        let next = TransitionId::from_usize(self.cols);
        for row in self.rows.iter_mut() {
            row.push(T::default());
        }
        self.cols += 1;
        next
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> &T {
        &self.rows[place][transition.index()]
    }

    pub fn get_mut(&mut self, place: PlaceId, transition: TransitionId) -> &mut T {
        &mut self.rows[place][transition.index()]
    }

    pub fn row(&self, place: PlaceId) -> &[T] {
        &self.rows[place]
    }

    /// Entries of one transition column, in place order.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = (PlaceId, &T)> + '_ {
        self.rows
            .iter_enumerated()
            .map(move |(place, row)| (place, &row[transition.index()]))
    }
}

impl Incidence<u64> {
    /// `self - other` entrywise, i.e. `C = Post - Pre` when called on `Post`.
    pub fn difference(&self, other: &Self) -> Incidence<i128> {
        assert_eq!(self.places(), other.places());
        assert_eq!(self.transitions(), other.transitions());
        let rows = self
            .rows
            .iter()
            .zip(other.rows.iter())
            .map(|(left, right)| {
                left.iter()
                    .zip(right.iter())
                    .map(|(l, r)| *l as i128 - *r as i128)
                    .collect::<SmallRow<_>>()
            })
            .collect();
        Incidence {
            rows,
            cols: self.cols,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Incidence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_in_both_dimensions() {
        let mut pre: Incidence<u64> = Incidence::new(0, 0);
        let p0 = pre.push_place();
        let t0 = pre.push_transition();
        let p1 = pre.push_place();
        let t1 = pre.push_transition();
        *pre.get_mut(p1, t1) = 3;

        assert_eq!(pre.places(), 2);
        assert_eq!(pre.transitions(), 2);
        assert_eq!(*pre.get(p0, t0), 0);
        assert_eq!(*pre.get(p1, t1), 3);
        assert_eq!(pre.row(p1), &[0, 3]);
    }

    #[test]
    fn difference_is_post_minus_pre() {
        let mut pre: Incidence<u64> = Incidence::new(2, 1);
        let mut post: Incidence<u64> = Incidence::new(2, 1);
        let t = TransitionId::new(0);
        *pre.get_mut(PlaceId::new(0), t) = 2;
        *post.get_mut(PlaceId::new(1), t) = 1;

        let c = post.difference(&pre);
        let column: Vec<i128> = c.column(t).map(|(_, v)| *v).collect();
        assert_eq!(column, vec![-2, 1]);
    }
}
