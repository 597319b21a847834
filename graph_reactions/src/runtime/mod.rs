//! Graph evaluation - entering and exiting nodes, checking transitions.
//!
//! Everything here takes the graph and the instance explicitly. The graph is
//! never written to; all runtime flags live in the instance's
//! [`GraphState`](crate::GraphState).
//!
//! Transition evaluation is ancestor-first: the outermost state machine's
//! transitions are checked before the node's own. Each level applies its
//! own [`TransitionMode`], so a selective node still stops at its first
//! passing transition even after an ancestor transition has fired.

use behavior_graph::{Graph, Node, NodeId, NodeKind, Transition, TransitionMode};

use crate::capability::{ActionList, ConditionList, Invoker, Trigger};
use crate::instance::ReactionInstance;
use crate::registry::ComponentKey;

/// Enter a node.
///
/// A state runs its bound action list. A state machine enters its start
/// node and arms its trigger-state children; one that is already entered is
/// left as it is.
pub fn on_enter(graph: &Graph, instance: &mut ReactionInstance, node: NodeId, invoker: &Invoker) {
    let Some(current) = graph.node(node) else {
        tracing::warn!(%node, "cannot enter a node the graph does not contain");
        return;
    };

    match &current.kind {
        NodeKind::StateMachine(data) => {
            if !instance.state.enter(node) {
                tracing::trace!(node = %current.name, "state machine already entered");
                return;
            }
            tracing::debug!(node = %current.name, invoker = %invoker.name, "entered state machine");
            if let Some(start) = data.start_node {
                on_enter(graph, instance, start, invoker);
            }
            arm_triggers(graph, instance, node);
        }
        NodeKind::State => {
            instance.state.enter(node);
            tracing::debug!(node = %current.name, invoker = %invoker.name, "entered state");
            if let Some(actions) = instance.registry.find_mut::<ActionList>(node) {
                actions.run(invoker);
            }
        }
        NodeKind::TriggerState => {
            instance.state.enter(node);
            tracing::debug!(node = %current.name, invoker = %invoker.name, "entered trigger state");
        }
    }
}

/// Exit a node.
///
/// Clears the entered flag and the fired flags of its transitions. A state
/// stops its action list; a state machine exits its entered children and
/// disarms its trigger states.
pub fn on_exit(graph: &Graph, instance: &mut ReactionInstance, node: NodeId, invoker: &Invoker) {
    let Some(current) = graph.node(node) else {
        return;
    };

    let was_entered = instance.state.exit(node);
    instance.state.clear_transitions(&current.transitions);

    match &current.kind {
        NodeKind::StateMachine(data) => {
            for child in &data.nodes {
                if instance.state.is_entered(*child) {
                    on_exit(graph, instance, *child, invoker);
                }
                instance.state.disarm(*child);
            }
        }
        NodeKind::State => {
            if let Some(actions) = instance.registry.find_mut::<ActionList>(node) {
                actions.stop();
            }
        }
        NodeKind::TriggerState => {}
    }

    if was_entered {
        tracing::debug!(node = %current.name, invoker = %invoker.name, "exited");
    }
}

/// Targets reached by evaluating `node` and its ancestors.
///
/// Ancestors go first, outermost first, then the node itself. Within a
/// level transitions are checked in declaration order. The result keeps
/// that order and holds each target once.
pub fn validate_transitions(
    graph: &Graph,
    instance: &mut ReactionInstance,
    node: NodeId,
    invoker: &Invoker,
) -> Vec<NodeId> {
    collect_moves(graph, instance, node, invoker)
        .into_iter()
        .map(|(_, target)| target)
        .collect()
}

/// Fired transitions as `(level, target)` pairs, where `level` is the node
/// whose transition fired. Same order and deduplication as
/// [`validate_transitions`].
fn collect_moves(
    graph: &Graph,
    instance: &mut ReactionInstance,
    node: NodeId,
    invoker: &Invoker,
) -> Vec<(NodeId, NodeId)> {
    let mut levels = graph.ancestors(node);
    levels.reverse();
    levels.push(node);

    let mut moves = Vec::new();
    for level in levels {
        collect_level(graph, instance, level, invoker, &mut moves);
    }
    moves
}

fn collect_level(
    graph: &Graph,
    instance: &mut ReactionInstance,
    node: NodeId,
    invoker: &Invoker,
    moves: &mut Vec<(NodeId, NodeId)>,
) {
    let Some(current) = graph.node(node) else {
        return;
    };

    for id in &current.transitions {
        let Some(transition) = graph.transition(*id) else {
            continue;
        };
        let Some(target) = validate_transition(graph, instance, transition, node, invoker) else {
            continue;
        };
        if !moves.iter().any(|(_, t)| *t == target) {
            moves.push((node, target));
        }
        if current.transition_mode == TransitionMode::Selective {
            break;
        }
    }
}

/// Check one transition on behalf of `invoking_node`.
///
/// Returns the target when the transition fires. Muted transitions never
/// fire. A conditioned transition with no condition list bound is logged
/// and treated as failing.
pub fn validate_transition(
    graph: &Graph,
    instance: &mut ReactionInstance,
    transition: &Transition,
    invoking_node: NodeId,
    invoker: &Invoker,
) -> Option<NodeId> {
    if transition.mute {
        tracing::trace!(transition = %transition.id, "muted");
        return None;
    }

    if transition.use_conditions {
        if !instance.registry.has_conditions(transition) {
            tracing::warn!(transition = %transition.id, "transition uses conditions but none are bound");
            return None;
        }
        let conditions = instance.registry.get_condition::<ConditionList>(transition)?;
        let passed = conditions.check(invoker);
        tracing::trace!(
            transition = %transition.id,
            passed,
            negative = transition.is_negative,
            "checked conditions"
        );
        if !transition.accepts(passed) {
            return None;
        }
    }

    if !graph.contains_node(transition.to_node) {
        tracing::warn!(transition = %transition.id, target = %transition.to_node, "transition target is missing");
        return None;
    }

    if invoking_node == transition.from_node {
        instance.state.mark_transition(transition.id);
    }
    tracing::debug!(
        transition = %transition.id,
        from = %transition.from_node,
        to = %transition.to_node,
        "transition fired"
    );
    Some(transition.to_node)
}

/// Move the instance into `target`.
///
/// Ancestors of the target that are not entered yet are entered without
/// descending into their start nodes. At every level the entered siblings
/// are exited first, which exits the old branch up to the common ancestor.
/// An already entered target is exited and entered again.
pub fn transition_to(graph: &Graph, instance: &mut ReactionInstance, target: NodeId, invoker: &Invoker) -> bool {
    if !graph.contains_node(target) {
        tracing::warn!(%target, "cannot move to a node the graph does not contain");
        return false;
    }

    let mut chain = graph.ancestors(target);
    chain.reverse();
    for ancestor in chain {
        if instance.state.is_entered(ancestor) {
            continue;
        }
        exit_siblings(graph, instance, ancestor, invoker);
        instance.state.enter(ancestor);
        arm_triggers(graph, instance, ancestor);
        tracing::trace!(node = %ancestor, "entered on the way to a transition target");
    }

    if instance.state.is_entered(target) {
        on_exit(graph, instance, target, invoker);
    }
    exit_siblings(graph, instance, target, invoker);
    on_enter(graph, instance, target, invoker);
    true
}

/// Evaluate every active leaf once and follow the transitions that fire.
///
/// Returns the nodes entered by this tick. When several targets fire for
/// one leaf they are entered in order, so siblings in the same state
/// machine replace each other and the last one stays active.
///
/// A transition is skipped when its source was exited by a move from
/// another node earlier in the pass, so an ancestor's escape is not undone
/// by a transition inside the branch it left.
pub fn tick(graph: &Graph, instance: &mut ReactionInstance, invoker: &Invoker) -> Vec<NodeId> {
    let mut entered = Vec::new();

    for leaf in active_leaves(graph, instance) {
        // An earlier move this tick may have exited it.
        if !instance.state.is_entered(leaf) {
            continue;
        }

        let mut fired: Vec<NodeId> = Vec::new();
        for (source, target) in collect_moves(graph, instance, leaf, invoker) {
            if !instance.state.is_entered(source) && !fired.contains(&source) {
                tracing::trace!(node = %source, %target, "source left earlier this tick, move skipped");
                continue;
            }
            fired.push(source);
            if transition_to(graph, instance, target, invoker) && !entered.contains(&target) {
                entered.push(target);
            }
        }
    }
    entered
}

/// Ignite a trigger state.
///
/// Does nothing unless the node is an armed trigger state whose trigger
/// component, if one is bound, is enabled. Only the trigger's own
/// transitions are evaluated. Returns the nodes entered.
pub fn ignite(graph: &Graph, instance: &mut ReactionInstance, trigger_node: NodeId, invoker: &Invoker) -> Vec<NodeId> {
    let Some(node) = graph.node(trigger_node) else {
        tracing::warn!(node = %trigger_node, "cannot ignite a node the graph does not contain");
        return Vec::new();
    };
    if !node.is_trigger_state() {
        tracing::warn!(node = %node.name, "ignition on a node that is not a trigger state");
        return Vec::new();
    }
    if !instance.state.is_armed(trigger_node) {
        tracing::debug!(node = %node.name, "trigger not armed, ignition ignored");
        return Vec::new();
    }
    if instance
        .registry
        .find::<Trigger>(trigger_node)
        .is_some_and(|trigger| !trigger.enabled)
    {
        tracing::debug!(node = %node.name, "trigger disabled, ignition ignored");
        return Vec::new();
    }

    tracing::debug!(node = %node.name, invoker = %invoker.name, "ignited");
    let mut moves = Vec::new();
    collect_level(graph, instance, trigger_node, invoker, &mut moves);

    let mut entered = Vec::new();
    for (_, target) in moves {
        if transition_to(graph, instance, target, invoker) {
            entered.push(target);
        }
    }
    entered
}

/// Fire an igniter and ignite the trigger state it feeds.
pub fn ignite_igniter(
    graph: &Graph,
    instance: &mut ReactionInstance,
    igniter: ComponentKey,
    invoker: &Invoker,
) -> Vec<NodeId> {
    let Some(component) = instance.registry.igniter_mut(igniter) else {
        tracing::warn!(%igniter, "no igniter attached under this key");
        return Vec::new();
    };
    let Some(trigger) = component.fire() else {
        tracing::debug!(%igniter, "igniter disabled or unbound");
        return Vec::new();
    };
    ignite(graph, instance, NodeId(trigger.0), invoker)
}

/// Entered nodes, in the order they were entered.
pub fn active_nodes(graph: &Graph, instance: &ReactionInstance) -> Vec<NodeId> {
    instance
        .state
        .entered()
        .iter()
        .copied()
        .filter(|id| graph.contains_node(*id))
        .collect()
}

/// Entered nodes with no entered children, excluding trigger states.
/// These are the nodes a tick polls.
pub fn active_leaves(graph: &Graph, instance: &ReactionInstance) -> Vec<NodeId> {
    instance
        .state
        .entered()
        .iter()
        .copied()
        .filter(|id| {
            graph.node(*id).is_some_and(|node| {
                !node.is_trigger_state() && !node.children().iter().any(|c| instance.state.is_entered(*c))
            })
        })
        .collect()
}

fn arm_triggers(graph: &Graph, instance: &mut ReactionInstance, state_machine: NodeId) {
    for child in graph.children(state_machine) {
        if graph.node(*child).is_some_and(Node::is_trigger_state) {
            instance.state.arm(*child);
        }
    }
}

fn exit_siblings(graph: &Graph, instance: &mut ReactionInstance, node: NodeId, invoker: &Invoker) {
    let Some(parent) = graph.node(node).and_then(|n| n.parent) else {
        return;
    };
    for sibling in graph.children(parent) {
        if *sibling != node && instance.state.is_entered(*sibling) {
            on_exit(graph, instance, *sibling, invoker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Action, Igniter};
    use behavior_graph::TransitionId;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Tally {
        runs: Rc<Cell<u32>>,
        stops: Rc<Cell<u32>>,
    }

    impl Action for Tally {
        fn run(&mut self, _invoker: &Invoker) {
            self.runs.set(self.runs.get() + 1);
        }

        fn stop(&mut self) {
            self.stops.set(self.stops.get() + 1);
        }
    }

    fn bind_tally(instance: &mut ReactionInstance, node: NodeId) -> Tally {
        let tally = Tally::default();
        instance
            .registry_mut()
            .register(node.graph_id(), Box::new(ActionList::new().with_action(tally.clone())));
        tally
    }

    fn bind_condition(instance: &mut ReactionInstance, transition: TransitionId, result: bool) {
        instance.registry_mut().register(
            transition.graph_id(),
            Box::new(ConditionList::new().with_condition(move |_: &Invoker| result)),
        );
    }

    fn conditioned(graph: &mut Graph, from: NodeId, to: NodeId) -> TransitionId {
        graph
            .add_transition(Transition::new(from, to).with_conditions())
            .unwrap()
    }

    /// Root holding A (start), B, C and D, with no transitions yet.
    fn setup_test_graph() -> (Graph, [NodeId; 4]) {
        let mut graph = Graph::new("Npc");
        let root = graph.root();
        let a = graph.add_state(root, "A").unwrap();
        let b = graph.add_state(root, "B").unwrap();
        let c = graph.add_state(root, "C").unwrap();
        let d = graph.add_state(root, "D").unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_selective_node_takes_first_passing_transition() {
        let (mut graph, [a, b, c, _]) = setup_test_graph();
        let to_b = conditioned(&mut graph, a, b);
        let to_c = conditioned(&mut graph, a, c);
        let mut instance = ReactionInstance::new();
        bind_condition(&mut instance, to_b, false);
        bind_condition(&mut instance, to_c, true);
        let tally_b = bind_tally(&mut instance, b);
        let tally_c = bind_tally(&mut instance, c);
        let invoker = Invoker::default();

        on_enter(&graph, &mut instance, graph.root(), &invoker);
        assert_eq!(active_leaves(&graph, &instance), vec![a]);

        let entered = tick(&graph, &mut instance, &invoker);

        assert_eq!(entered, vec![c]);
        assert!(!instance.state().is_entered(a));
        assert!(instance.state().is_entered(c));
        assert_eq!(tally_b.runs.get(), 0);
        assert_eq!(tally_c.runs.get(), 1);
    }

    #[test]
    fn test_selective_short_circuit() {
        let (mut graph, [a, b, c, d]) = setup_test_graph();
        let t1 = conditioned(&mut graph, a, b);
        let t2 = conditioned(&mut graph, a, c);
        let t3 = conditioned(&mut graph, a, d);
        let mut instance = ReactionInstance::new();
        bind_condition(&mut instance, t1, false);
        bind_condition(&mut instance, t2, true);

        let checks = Rc::new(Cell::new(0));
        let counter = checks.clone();
        instance.registry_mut().register(
            t3.graph_id(),
            Box::new(ConditionList::new().with_condition(move |_: &Invoker| {
                counter.set(counter.get() + 1);
                true
            })),
        );

        let targets = validate_transitions(&graph, &mut instance, a, &Invoker::default());

        assert_eq!(targets, vec![c]);
        assert_eq!(checks.get(), 0);
    }

    #[test]
    fn test_parallel_node_takes_every_passing_transition() {
        let (mut graph, [a, b, c, d]) = setup_test_graph();
        graph.set_transition_mode(a, TransitionMode::Parallel).unwrap();
        let t1 = conditioned(&mut graph, a, b);
        let t2 = conditioned(&mut graph, a, c);
        let t3 = conditioned(&mut graph, a, d);
        let mut instance = ReactionInstance::new();
        bind_condition(&mut instance, t1, false);
        bind_condition(&mut instance, t2, true);
        bind_condition(&mut instance, t3, true);
        let tally_c = bind_tally(&mut instance, c);
        let invoker = Invoker::default();

        assert_eq!(validate_transitions(&graph, &mut instance, a, &invoker), vec![c, d]);

        on_enter(&graph, &mut instance, graph.root(), &invoker);
        let entered = tick(&graph, &mut instance, &invoker);

        // C was entered on the way, D is the one left standing.
        assert_eq!(entered, vec![c, d]);
        assert_eq!(tally_c.runs.get(), 1);
        assert_eq!(tally_c.stops.get(), 1);
        assert_eq!(active_leaves(&graph, &instance), vec![d]);
    }

    #[test]
    fn test_negation_and_mute() {
        let (mut graph, [a, b, ..]) = setup_test_graph();
        let negative = graph
            .add_transition(Transition::new(a, b).with_conditions().negated())
            .unwrap();
        let muted = graph
            .add_transition(Transition::new(a, b).with_mute(true))
            .unwrap();
        let plain_negative = graph.add_transition(Transition::new(a, b).negated()).unwrap();
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();

        let check = |graph: &Graph, instance: &mut ReactionInstance, id: TransitionId| {
            let transition = graph.transition(id).unwrap().clone();
            validate_transition(graph, instance, &transition, a, &invoker)
        };

        // Conditioned, nothing bound.
        assert_eq!(check(&graph, &mut instance, negative), None);

        bind_condition(&mut instance, negative, false);
        assert_eq!(check(&graph, &mut instance, negative), Some(b));

        instance.registry_mut().remove(negative.graph_id());
        bind_condition(&mut instance, negative, true);
        assert_eq!(check(&graph, &mut instance, negative), None);

        assert_eq!(check(&graph, &mut instance, muted), None);

        // Without conditions the transition always passes.
        assert_eq!(check(&graph, &mut instance, plain_negative), Some(b));
    }

    #[test]
    fn test_fired_transition_is_marked_for_its_source_only() {
        let (mut graph, [a, b, c, _]) = setup_test_graph();
        let t = graph.connect(a, b).unwrap();
        let other = graph.connect(c, b).unwrap();
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();

        let transition = graph.transition(t).unwrap().clone();
        validate_transition(&graph, &mut instance, &transition, a, &invoker);
        let transition = graph.transition(other).unwrap().clone();
        validate_transition(&graph, &mut instance, &transition, a, &invoker);

        assert!(instance.state().is_transition_entered(t));
        assert!(!instance.state().is_transition_entered(other));

        on_exit(&graph, &mut instance, a, &invoker);
        assert!(!instance.state().is_transition_entered(t));
    }

    #[test]
    fn test_ancestor_transitions_come_first() {
        let mut graph = Graph::new("Fighter");
        let root = graph.root();
        let combat = graph.add_state_machine(root, "Combat").unwrap();
        let dead = graph.add_state(root, "Dead").unwrap();
        let attack = graph.add_state(combat, "Attack").unwrap();
        let flee = graph.add_state(combat, "Flee").unwrap();
        let die = conditioned(&mut graph, combat, dead);
        let run = conditioned(&mut graph, attack, flee);
        let mut instance = ReactionInstance::new();
        bind_condition(&mut instance, die, true);
        bind_condition(&mut instance, run, true);
        let invoker = Invoker::default();

        assert_eq!(
            validate_transitions(&graph, &mut instance, attack, &invoker),
            vec![dead, flee]
        );
    }

    #[test]
    fn test_ancestor_escape_exits_the_branch() {
        let mut graph = Graph::new("Fighter");
        let root = graph.root();
        let combat = graph.add_state_machine(root, "Combat").unwrap();
        let dead = graph.add_state(root, "Dead").unwrap();
        let attack = graph.add_state(combat, "Attack").unwrap();
        let flee = graph.add_state(combat, "Flee").unwrap();
        let die = conditioned(&mut graph, combat, dead);
        let run = conditioned(&mut graph, attack, flee);
        let mut instance = ReactionInstance::new();
        bind_condition(&mut instance, die, true);
        bind_condition(&mut instance, run, false);
        let attack_tally = bind_tally(&mut instance, attack);
        let invoker = Invoker::default();

        on_enter(&graph, &mut instance, root, &invoker);
        assert_eq!(active_nodes(&graph, &instance), vec![root, combat, attack]);

        assert_eq!(tick(&graph, &mut instance, &invoker), vec![dead]);
        assert_eq!(active_nodes(&graph, &instance), vec![root, dead]);
        assert_eq!(attack_tally.stops.get(), 1);
    }

    #[test]
    fn test_ancestor_escape_wins_over_branch_transition() {
        let mut graph = Graph::new("Fighter");
        let root = graph.root();
        let combat = graph.add_state_machine(root, "Combat").unwrap();
        let dead = graph.add_state(root, "Dead").unwrap();
        let attack = graph.add_state(combat, "Attack").unwrap();
        let flee = graph.add_state(combat, "Flee").unwrap();
        let die = conditioned(&mut graph, combat, dead);
        let run = conditioned(&mut graph, attack, flee);
        let mut instance = ReactionInstance::new();
        bind_condition(&mut instance, die, true);
        bind_condition(&mut instance, run, true);
        let dead_tally = bind_tally(&mut instance, dead);
        let flee_tally = bind_tally(&mut instance, flee);
        let invoker = Invoker::default();

        on_enter(&graph, &mut instance, root, &invoker);
        let entered = tick(&graph, &mut instance, &invoker);

        assert_eq!(entered, vec![dead]);
        assert_eq!(active_nodes(&graph, &instance), vec![root, dead]);
        assert_eq!(dead_tally.runs.get(), 1);
        assert_eq!(dead_tally.stops.get(), 0);
        assert_eq!(flee_tally.runs.get(), 0);
    }

    #[test]
    fn test_transition_into_nested_state_machine() {
        let mut graph = Graph::new("Guard");
        let root = graph.root();
        let idle = graph.add_state(root, "Idle").unwrap();
        let alert = graph.add_state_machine(root, "Alert").unwrap();
        graph.add_state(alert, "Search").unwrap();
        let shout = graph.add_state(alert, "Shout").unwrap();
        graph.connect(idle, shout).unwrap();
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();

        on_enter(&graph, &mut instance, root, &invoker);
        let entered = tick(&graph, &mut instance, &invoker);

        assert_eq!(entered, vec![shout]);
        assert_eq!(active_nodes(&graph, &instance), vec![root, alert, shout]);
    }

    #[test]
    fn test_enter_and_exit_nested() {
        let mut graph = Graph::new("Guard");
        let root = graph.root();
        let patrol = graph.add_state_machine(root, "Patrol").unwrap();
        let walk = graph.add_state(patrol, "Walk").unwrap();
        let alarm = graph.add_trigger_state(root, "Alarm").unwrap();
        let mut instance = ReactionInstance::new();
        let tally = bind_tally(&mut instance, walk);
        let invoker = Invoker::default();

        on_enter(&graph, &mut instance, root, &invoker);
        on_enter(&graph, &mut instance, root, &invoker);

        assert_eq!(active_nodes(&graph, &instance), vec![root, patrol, walk]);
        assert!(instance.state().is_armed(alarm));
        assert_eq!(tally.runs.get(), 1);

        on_exit(&graph, &mut instance, root, &invoker);

        assert!(active_nodes(&graph, &instance).is_empty());
        assert!(!instance.state().is_armed(alarm));
        assert_eq!(tally.stops.get(), 1);
    }

    #[test]
    fn test_empty_state_machine() {
        let graph = Graph::new("Empty");
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();

        on_enter(&graph, &mut instance, graph.root(), &invoker);

        assert!(validate_transitions(&graph, &mut instance, graph.root(), &invoker).is_empty());
        assert!(tick(&graph, &mut instance, &invoker).is_empty());
        assert_eq!(active_nodes(&graph, &instance), vec![graph.root()]);
    }

    #[test]
    fn test_ignite_trigger_state() {
        let mut graph = Graph::new("Trap");
        let root = graph.root();
        let idle = graph.add_state(root, "Idle").unwrap();
        let plate = graph.add_trigger_state(root, "Plate").unwrap();
        let sprung = graph.add_state(root, "Sprung").unwrap();
        graph.connect(plate, sprung).unwrap();
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();

        // Not armed before the root is entered.
        assert!(ignite(&graph, &mut instance, plate, &invoker).is_empty());

        on_enter(&graph, &mut instance, root, &invoker);
        assert!(tick(&graph, &mut instance, &invoker).is_empty());

        let entered = ignite(&graph, &mut instance, plate, &invoker);
        assert_eq!(entered, vec![sprung]);
        assert!(!instance.state().is_entered(idle));
        assert!(instance.state().is_entered(sprung));

        assert!(ignite(&graph, &mut instance, idle, &invoker).is_empty());
    }

    #[test]
    fn test_disabled_trigger_ignores_ignition() {
        let mut graph = Graph::new("Trap");
        let root = graph.root();
        let idle = graph.add_state(root, "Idle").unwrap();
        let plate = graph.add_trigger_state(root, "Plate").unwrap();
        let sprung = graph.add_state(root, "Sprung").unwrap();
        graph.connect(plate, sprung).unwrap();
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();
        instance
            .registry_mut()
            .get_reaction::<Trigger>(graph.node(plate).unwrap())
            .unwrap()
            .enabled = false;

        on_enter(&graph, &mut instance, root, &invoker);

        assert!(ignite(&graph, &mut instance, plate, &invoker).is_empty());
        assert!(instance.state().is_entered(idle));
    }

    #[test]
    fn test_igniter_fires_its_trigger() {
        let mut graph = Graph::new("Trap");
        let root = graph.root();
        graph.add_state(root, "Idle").unwrap();
        let plate = graph.add_trigger_state(root, "Plate").unwrap();
        let sprung = graph.add_state(root, "Sprung").unwrap();
        graph.connect(plate, sprung).unwrap();
        let mut instance = ReactionInstance::new();
        let invoker = Invoker::default();
        let key = instance
            .registry_mut()
            .attach_igniter(graph.node(plate).unwrap(), Igniter::new("step"))
            .unwrap();

        on_enter(&graph, &mut instance, root, &invoker);

        assert_eq!(ignite_igniter(&graph, &mut instance, key, &invoker), vec![sprung]);
        assert_eq!(instance.registry_mut().igniter_mut(key).unwrap().fired(), 1);
    }
}
