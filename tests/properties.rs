//! Property tests: block invariants and suggestion exclusions over random graphs.

use std::sync::Arc;

use proptest::prelude::*;

use linkgraph::{
    Config, ConnectionError, ConnectionQuery, ConnectionRecord, ConnectionState, GraphStore,
    MemoryGraph, Service, StaticVisibility,
};

const USERS: usize = 8;

fn user(i: usize) -> String {
    format!("user-{}", i % USERS)
}

#[derive(Debug, Clone)]
enum Edge {
    Connect(usize, usize, bool),
    Block(usize, usize),
}

fn edge_strategy() -> impl Strategy<Value = Edge> {
    prop_oneof![
        3 => (0..USERS, 0..USERS, any::<bool>()).prop_map(|(a, b, pending)| Edge::Connect(a, b, pending)),
        1 => (0..USERS, 0..USERS).prop_map(|(a, b)| Edge::Block(a, b)),
    ]
}

/// Graph built straight through the store, so connections between blocked
/// pairs can exist as they would after a racing write.
fn build(edges: &[Edge], private: &[usize]) -> (Arc<MemoryGraph>, Service) {
    let store = Arc::new(MemoryGraph::ephemeral());
    for edge in edges {
        match *edge {
            Edge::Connect(a, b, pending) => {
                let state = if pending { ConnectionState::Pending } else { ConnectionState::Connected };
                store.merge_connection(ConnectionRecord::new(user(a), user(b), state)).unwrap();
            }
            Edge::Block(a, b) => {
                store.merge_block(&user(a), &user(b)).unwrap();
            }
        }
    }

    let visibility = Arc::new(StaticVisibility::public());
    for &p in private {
        visibility.set_private(&user(p), true);
    }
    let service = Service::new(store.clone(), visibility, &Config::default());
    (store, service)
}

fn all_edges(store: &MemoryGraph) -> Vec<ConnectionRecord> {
    let mut edges = store.find_connections(&ConnectionQuery::new()).unwrap();
    edges.sort_by(|x, y| (&x.user_id, &x.connected_user_id).cmp(&(&y.user_id, &y.connected_user_id)));
    edges
}

proptest! {
    #[test]
    fn prop_block_separates_pair(
        edges in prop::collection::vec(edge_strategy(), 0..40),
        a in 0..USERS,
        b in 0..USERS,
    ) {
        let (store, service) = build(&edges, &[]);

        service.blocks.block(&user(a), &user(b)).unwrap();

        prop_assert!(service.blocks.is_blocked_either(&user(a), &user(b)).unwrap());
        prop_assert!(service.blocks.is_blocked_either(&user(b), &user(a)).unwrap());
        prop_assert!(store.get_connection(&user(a), &user(b)).unwrap().is_none());
        prop_assert!(store.get_connection(&user(b), &user(a)).unwrap().is_none());
    }

    #[test]
    fn prop_blocked_pair_rejects_mutations(
        edges in prop::collection::vec(edge_strategy(), 0..40),
        a in 0..USERS,
        b in 0..USERS,
        reverse in any::<bool>(),
    ) {
        let (store, service) = build(&edges, &[]);
        let (blocker, blocked) = if reverse { (b, a) } else { (a, b) };
        store.merge_block(&user(blocker), &user(blocked)).unwrap();
        let before = all_edges(&store);

        let rel = &service.relationships;
        let (x, y) = (user(a), user(b));
        let results: Vec<Result<(), ConnectionError>> = vec![
            rel.create_connection(&x, &y).map(|_| ()),
            rel.approve_connection(&x, &y).map(|_| ()),
            rel.reject_connection(&x, &y),
            rel.delete_connection(&x, &y),
            rel.change_message_notification(&x, &y).map(|_| ()),
            rel.change_post_notification(&x, &y).map(|_| ()),
            rel.change_comment_notification(&x, &y).map(|_| ()),
        ];

        for result in results {
            let blocked = matches!(result, Err(ConnectionError::Blocked { .. }));
            prop_assert!(blocked, "{:?}", result);
        }
        prop_assert_eq!(all_edges(&store), before);
    }

    #[test]
    fn prop_create_follows_visibility(
        a in 0..USERS,
        b in 0..USERS,
        private in any::<bool>(),
    ) {
        let private_users = if private { vec![b] } else { vec![] };
        let (_store, service) = build(&[], &private_users);

        let record = service.relationships.create_connection(&user(a), &user(b)).unwrap();
        prop_assert_eq!(record.is_pending(), private);
        prop_assert_eq!(record.is_connected(), !private);
    }

    #[test]
    fn prop_suggestions_exclude_self_and_blocked(
        edges in prop::collection::vec(edge_strategy(), 0..60),
        u in 0..USERS,
    ) {
        let (_store, service) = build(&edges, &[]);
        let me = user(u);

        let suggestions = service.suggestions.get_suggestions(&me).unwrap();

        for candidate in &suggestions {
            prop_assert_ne!(candidate, &me);
            prop_assert!(!service.blocks.is_blocked_either(&me, candidate).unwrap());
        }
    }

    #[test]
    fn prop_stored_edges_have_single_state(
        edges in prop::collection::vec(edge_strategy(), 0..40),
        approvals in prop::collection::vec((0..USERS, 0..USERS), 0..10),
    ) {
        let (store, service) = build(&edges, &[]);
        for (a, b) in approvals {
            let _ = service.relationships.approve_connection(&user(a), &user(b));
        }

        for edge in all_edges(&store) {
            prop_assert!(edge.is_pending() != edge.is_connected());
        }
        let mut pairs: Vec<(String, String)> = all_edges(&store)
            .into_iter()
            .map(|e| (e.user_id, e.connected_user_id))
            .collect();
        let total = pairs.len();
        pairs.dedup();
        prop_assert_eq!(pairs.len(), total);
    }
}
