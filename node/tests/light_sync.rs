//! Integration tests: announcement intake, header sync, and on-demand
//! retrieval running together on one node.

use std::sync::Arc;

use tokio::sync::mpsc;

use wisp_chain::{FullBackend, StateSnapshot};
use wisp_net::{Announcement, PeerHandle, PeerRequest};
use wisp_node::{GateAction, LightNode, NodeConfig, ServiceState};
use wisp_odr::{OdrError, Payload, Retrieval};
use wisp_types::{Account, Address, Hash, Header, PeerId, Transaction, Weight};

fn addr(n: u8) -> Address {
    Address::new([n; 20])
}

fn tx(nonce: u64) -> Transaction {
    Transaction {
        nonce,
        from: addr(1),
        to: addr(2),
        value: 1,
        input: vec![],
    }
}

/// A backend holding `blocks` non-empty blocks over a two-account state.
fn full_backend(blocks: u64) -> (Arc<FullBackend>, Vec<Header>) {
    let mut genesis_state = StateSnapshot::new();
    genesis_state.insert(addr(1), Account {
        nonce: 0,
        balance: 100,
        code_hash: Hash::digest(b"code"),
    });
    genesis_state.insert(addr(2), Account {
        nonce: 0,
        balance: 50,
        code_hash: Hash::digest(b"code"),
    });
    let backend = Arc::new(FullBackend::new(genesis_state, Weight::new(1)));

    let mut headers = Vec::new();
    for n in 0..blocks {
        let mut state = StateSnapshot::new();
        state.insert(addr(1), Account {
            nonce: n + 1,
            balance: 100 - n as u128,
            code_hash: Hash::digest(b"code"),
        });
        state.insert(addr(2), Account {
            nonce: 0,
            balance: 50 + n as u128,
            code_hash: Hash::digest(b"code"),
        });
        let header = backend
            .extend_chain(vec![tx(n)], state, Weight::new(1))
            .expect("extend");
        headers.push(header);
    }
    (backend, headers)
}

/// Register a peer on the node whose requests are all served from
/// `backend`.
fn connect_serving_peer(node: &LightNode, id: &str, backend: &Arc<FullBackend>) {
    let (sender, mut rx) = mpsc::channel::<PeerRequest>(32);
    let handle = Arc::new(PeerHandle::new(PeerId::from(id), false, sender));
    node.register_peer(handle).expect("register");
    let backend = Arc::clone(backend);
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match request {
                PeerRequest::Headers { to, count, reply } => {
                    let _ = reply.send(backend.headers_ending_at(&to, count));
                }
                PeerRequest::Block { hash, reply } => {
                    let _ = reply.send(backend.body(&hash));
                }
                PeerRequest::Receipts { hash, reply } => {
                    let _ = reply.send(backend.receipts(&hash));
                }
                PeerRequest::AccountProof {
                    state_root,
                    address,
                    reply,
                } => {
                    let _ = reply.send(backend.account_proof(&state_root, &address));
                }
                PeerRequest::TxStatus { hash, reply } => {
                    let _ = reply.send(backend.tx_status(&hash));
                }
            }
        }
    });
}

fn announcement_for(header: &Header, weight: u128) -> Announcement {
    Announcement {
        hash: header.hash(),
        number: header.number,
        weight: Weight::new(weight),
        parent_hash: header.parent_hash,
    }
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn announce_sync_then_retrieve() {
    let (backend, headers) = full_backend(3);
    let config = NodeConfig {
        trusted_peers: vec!["t1".into(), "t2".into()],
        trust_fraction: 100,
        ..NodeConfig::default()
    };
    let node = LightNode::new(&config, backend.genesis_header());
    node.start();

    connect_serving_peer(&node, "t1", &backend);
    connect_serving_peer(&node, "t2", &backend);
    settle().await;

    // Both trusted peers confirm the tip (cumulative weight 1 + 3).
    let tip = &headers[2];
    node.handle_announcement(&PeerId::from("t1"), &announcement_for(tip, 4));
    node.handle_announcement(&PeerId::from("t2"), &announcement_for(tip, 4));

    let report = node.sync_once().await.expect("sync").expect("candidate");
    assert_eq!(report.inserted, 3);
    assert_eq!(node.chain().head().hash, tip.hash());

    // Retrieval anchored to the freshly synced tip.
    let payload = node
        .retrieve(Retrieval::Account {
            anchor: tip.clone(),
            address: addr(1),
        })
        .await
        .expect("account");
    assert_eq!(
        payload,
        Payload::Account(backend.account(&tip.state_root, &addr(1)).unwrap())
    );

    // The same request again is a cache hit.
    node.retrieve(Retrieval::Account {
        anchor: tip.clone(),
        address: addr(1),
    })
    .await
    .expect("cached account");

    let metrics = node.metrics();
    assert_eq!(metrics.headers_inserted.get(), 3);
    assert_eq!(metrics.announcements_received.get(), 2);
    assert_eq!(metrics.retrievals_dispatched.get(), 1);
    assert_eq!(metrics.retrievals_cached.get(), 1);
    assert_eq!(metrics.retrievals_failed.get(), 0);
}

#[tokio::test]
async fn below_trust_fraction_holds_position() {
    let (backend, headers) = full_backend(1);
    let config = NodeConfig {
        trusted_peers: vec!["t1".into(), "t2".into()],
        trust_fraction: 100,
        ..NodeConfig::default()
    };
    let node = LightNode::new(&config, backend.genesis_header());
    node.start();

    connect_serving_peer(&node, "t1", &backend);
    connect_serving_peer(&node, "t2", &backend);
    settle().await;

    // Only one of two trusted peers confirms.
    node.handle_announcement(&PeerId::from("t1"), &announcement_for(&headers[0], 2));

    assert_eq!(node.sync_once().await.expect("sync"), None);
    assert_eq!(node.chain().head().number, 0);
}

#[tokio::test]
async fn service_gate_follows_sync_rounds() {
    let (backend, headers) = full_backend(1);
    let config = NodeConfig::default();
    let node = LightNode::new(&config, backend.genesis_header());
    node.start();
    connect_serving_peer(&node, "p1", &backend);
    settle().await;

    assert_eq!(node.request_service_start(), GateAction::Start);
    assert_eq!(node.gate().state(), ServiceState::Running);

    node.handle_announcement(&PeerId::from("p1"), &announcement_for(&headers[0], 2));
    node.sync_once().await.expect("sync").expect("candidate");

    // The round interrupted the service and restarted it on completion.
    assert_eq!(node.gate().state(), ServiceState::Running);
    assert!(!node.gate().is_syncing());
}

#[tokio::test]
async fn retrieval_with_no_peers_is_exhausted() {
    let (backend, headers) = full_backend(1);
    let node = LightNode::new(&NodeConfig::default(), backend.genesis_header());
    node.start();

    let err = node
        .retrieve(Retrieval::Block {
            anchor: headers[0].clone(),
            hash: headers[0].hash(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, OdrError::Exhausted);
    assert_eq!(node.metrics().retrievals_failed.get(), 1);
}

#[tokio::test]
async fn full_backend_node_answers_locally() {
    let (backend, headers) = full_backend(2);
    let node = LightNode::with_full_backend(&NodeConfig::default(), Arc::clone(&backend));
    node.start();

    let payload = node
        .retrieve(Retrieval::Block {
            anchor: headers[1].clone(),
            hash: headers[1].hash(),
        })
        .await
        .expect("local body");
    assert_eq!(
        payload,
        Payload::Block(backend.body(&headers[1].hash()).unwrap())
    );
}
