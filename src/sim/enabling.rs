//! 可激发集计算：`t` 可激发当且仅当 `∀(p, w) ∈ •t: M[p] ≥ w`。
use crate::net::{Marking, Net, TransitionId};

/// Whether `transition` may fire under `marking`. Unknown transitions are
/// never enabled; transitions without inputs always are.
pub fn is_enabled(net: &Net, marking: &Marking, transition: TransitionId) -> bool {
    let Some(spec) = net.transition(transition) else {
        return false;
    };
    spec.inputs()
        .iter()
        .all(|&(place, weight)| marking.try_get(place).is_some_and(|tokens| tokens >= weight))
}

/// Enabled transitions in declaration order.
pub fn enabled(net: &Net, marking: &Marking) -> Vec<TransitionId> {
    let mut out = Vec::new();
    enabled_into(net, marking, &mut out);
    out
}

/// Same as [`enabled`] but reuses `out` to avoid reallocating in the hot loop.
pub fn enabled_into(net: &Net, marking: &Marking, out: &mut Vec<TransitionId>) {
    out.clear();
    out.extend(
        net.transitions()
            .map(|(id, _)| id)
            .filter(|&id| is_enabled(net, marking, id)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Rate;

    #[test]
    fn enabling_respects_arc_weights() {
        let mut net = Net::empty();
        let a = net.add_place("a", 2).unwrap();
        let b = net.add_place("b", 0).unwrap();
        let t_ab = net.add_transition("a_to_b", Rate::mass_action(1.0)).unwrap();
        let t_heavy = net.add_transition("heavy", Rate::mass_action(1.0)).unwrap();
        let t_b = net.add_transition("needs_b", Rate::mass_action(1.0)).unwrap();
        let t_src = net.add_transition("source", Rate::constant(1.0)).unwrap();
        net.add_input_arc(a, t_ab, 1).unwrap();
        net.add_output_arc(b, t_ab, 1).unwrap();
        net.add_input_arc(a, t_heavy, 3).unwrap();
        net.add_input_arc(b, t_b, 1).unwrap();
        net.add_output_arc(a, t_src, 1).unwrap();
        net.freeze().unwrap();

        let m0 = net.initial_marking();
        assert_eq!(enabled(&net, &m0), vec![t_ab, t_src]);

        let m1 = m0.apply(t_ab, &net).unwrap();
        assert_eq!(enabled(&net, &m1), vec![t_ab, t_b, t_src]);
        assert!(!is_enabled(&net, &m1, t_heavy));
        assert!(!is_enabled(&net, &m1, TransitionId::new(42)));
    }

    #[test]
    fn evaluation_is_pure() {
        let mut net = Net::empty();
        let a = net.add_place("a", 1).unwrap();
        let t = net.add_transition("t", Rate::mass_action(1.0)).unwrap();
        net.add_input_arc(a, t, 1).unwrap();
        net.freeze().unwrap();
        let m = net.initial_marking();
        let first = enabled(&net, &m);
        let second = enabled(&net, &m);
        assert_eq!(first, second);
        assert_eq!(m, net.initial_marking());
    }
}
