use proptest::prelude::*;
use twr_core::{
    DecisionHistoryStore, Fix, Group, ManualClock, MemoryStore, NavigationMode, Severity, Tier,
};

const FIX_COUNT: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Accept(usize, String),
    Reject(usize, String),
    Clear(usize),
    Note(usize, String),
    AcceptGroup,
    RejectGroup,
    AcceptTier(Tier),
    AcceptAll,
    RejectAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let index = 0..FIX_COUNT;
    let note = "[a-z]{0,6}";
    prop_oneof![
        (index.clone(), note).prop_map(|(i, n)| Op::Accept(i, n)),
        (index.clone(), note).prop_map(|(i, n)| Op::Reject(i, n)),
        index.clone().prop_map(Op::Clear),
        (index, note).prop_map(|(i, n)| Op::Note(i, n)),
        Just(Op::AcceptGroup),
        Just(Op::RejectGroup),
        prop_oneof![Just(Tier::Safe), Just(Tier::Review), Just(Tier::Manual)]
            .prop_map(Op::AcceptTier),
        Just(Op::AcceptAll),
        Just(Op::RejectAll),
    ]
}

fn fixes() -> Vec<Fix> {
    let tiers = [Tier::Safe, Tier::Review, Tier::Manual];
    let severities = [Severity::Low, Severity::Critical, Severity::High];
    (0..FIX_COUNT)
        .map(|i| Fix {
            category: format!("cat{}", i % 2),
            severity: severities[i % 3],
            confidence_tier: tiers[i % 3],
            page: (i as u32 % 3) + 1,
            ..Fix::default()
        })
        .collect()
}

fn new_store() -> (DecisionHistoryStore, ManualClock) {
    let clock = ManualClock::new(0);
    let mut store = DecisionHistoryStore::new(MemoryStore::new(), clock.clone());
    let group = Group {
        group_id: "G".into(),
        fix_indices: vec![1, 3, 5],
        label: None,
    };
    store.init("prop", fixes(), vec![group]).unwrap();
    (store, clock)
}

/// Applies `op`; returns `true` when it recorded a history action.
fn apply(store: &mut DecisionHistoryStore, op: &Op) -> bool {
    let before = store.history().unwrap().past().len();
    let _ = match op {
        Op::Accept(i, n) => store.accept(*i, n).map(|_| ()),
        Op::Reject(i, n) => store.reject(*i, n).map(|_| ()),
        Op::Clear(i) => store.clear_decision(*i).map(|_| ()),
        Op::Note(i, n) => store.set_note(*i, n).map(|_| ()),
        Op::AcceptGroup => store.accept_group("G", "grp").map(|_| ()),
        Op::RejectGroup => store.reject_group("G", "grp").map(|_| ()),
        Op::AcceptTier(t) => store.accept_by_tier(*t).map(|_| ()),
        Op::AcceptAll => store.accept_all_pending().map(|_| ()),
        Op::RejectAll => store.reject_all_pending().map(|_| ()),
    };
    store.history().unwrap().past().len() > before
}

proptest! {
    #[test]
    fn prop_undo_restores_every_prior_decision_map(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut store, clock) = new_store();
        let mut snapshots = Vec::new();
        for op in &ops {
            let snapshot = store.decisions().unwrap().clone();
            clock.advance(7);
            if apply(&mut store, op) {
                snapshots.push(snapshot);
            }
        }
        for expected in snapshots.iter().rev() {
            prop_assert!(store.undo().unwrap().is_some());
            prop_assert_eq!(store.decisions().unwrap(), expected);
        }
        prop_assert!(!store.can_undo());
    }

    #[test]
    fn prop_forward_action_always_empties_future(
        ops in prop::collection::vec(op_strategy(), 1..20),
        undos in 0usize..10,
        next in op_strategy(),
    ) {
        let (mut store, _) = new_store();
        for op in &ops {
            apply(&mut store, op);
        }
        for _ in 0..undos {
            store.undo().unwrap();
        }
        if apply(&mut store, &next) {
            prop_assert!(store.history().unwrap().future().is_empty());
        }
    }

    #[test]
    fn prop_navigation_order_is_a_stable_permutation(
        mode in prop_oneof![
            Just(NavigationMode::Sequential),
            Just(NavigationMode::Severity),
            Just(NavigationMode::Category),
            Just(NavigationMode::Page),
        ]
    ) {
        let (mut store, _) = new_store();
        store.set_navigation_mode(mode).unwrap();
        let first = store.navigation_order().unwrap().to_vec();
        store.set_navigation_mode(mode).unwrap();
        prop_assert_eq!(store.navigation_order().unwrap(), first.as_slice());

        let mut sorted = first.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..FIX_COUNT).collect::<Vec<_>>());
    }
}
