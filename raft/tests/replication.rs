use bytes::Bytes;

use raft::message::{HybridTime, OperationStatus};
use raft::state::ProposedEntry;
use raft::ticket::TicketState;

use common::*;

mod common;

fn entry(log_type: &str, data: &[u8]) -> ProposedEntry {
    ProposedEntry {
        log_type: log_type.to_string(),
        data: Bytes::copy_from_slice(data),
    }
}

#[test]
fn replicated_batch_commits_on_quorum() {
    let cluster = TestCluster::start(2);
    let leader = cluster.wait_for_leader();
    let follower = 1 - leader;

    let reply = cluster.replicas[leader]
        .handle
        .replicate_logs(vec![entry("greeting", b"hi")])
        .unwrap();
    assert_eq!(reply.status, OperationStatus::Success);
    let ticket = reply.ticket.expect("a successful proposal issues a ticket");

    cluster.wait_until("the ticket commits", |cluster| {
        match cluster.replicas[leader].handle.ticket_state(ticket).unwrap() {
            TicketState::Committed { last_index } => Some(last_index),
            _ => None,
        }
    });

    // the follower observes the commit on the next append round
    cluster.wait_until("the follower applies the commit", |cluster| {
        if cluster.replicas[follower].events.received_count("greeting") == 1 {
            Some(())
        } else {
            None
        }
    });
    let received = cluster.replicas[follower].events.received.lock().unwrap();
    assert_eq!(&received[..], &[(String::from("greeting"), b"hi".to_vec())]);
}

#[test]
fn batches_assign_dense_ids_across_requests() {
    use raft::log::LogStore;

    let cluster = TestCluster::start(2);
    let leader = cluster.wait_for_leader();

    let first = cluster.replicas[leader]
        .handle
        .replicate_logs(vec![entry("a", b"1"), entry("a", b"2")])
        .unwrap();
    let second = cluster.replicas[leader]
        .handle
        .replicate_logs(vec![entry("a", b"3")])
        .unwrap();
    assert_eq!(first.status, OperationStatus::Success);
    assert_eq!(second.status, OperationStatus::Success);

    cluster.wait_until("all three entries land on the follower", |cluster| {
        let follower = &cluster.replicas[1 - leader];
        if follower.store.get_max_log(0).unwrap() >= 3 {
            Some(())
        } else {
            None
        }
    });

    let leader_logs = cluster.replicas[leader].store.read_logs_range(0, 1).unwrap();
    assert_eq!(
        leader_logs.iter().map(|log| log.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn follower_rejects_client_replication() {
    use raft::log::LogStore;

    let cluster = TestCluster::start(2);
    let leader = cluster.wait_for_leader();
    let follower = 1 - leader;

    let reply = cluster.replicas[follower]
        .handle
        .replicate_logs(vec![entry("x", b"y")])
        .unwrap();
    assert_eq!(reply.status, OperationStatus::NodeIsNotLeader);
    assert_eq!(reply.ticket, None);

    // nothing was appended anywhere
    for replica in &cluster.replicas {
        assert_eq!(replica.store.get_max_log(0).unwrap(), 0);
    }
}

#[test]
fn unknown_tickets_report_not_found() {
    let cluster = TestCluster::start(2);
    let leader = cluster.wait_for_leader();

    let state = cluster.replicas[leader]
        .handle
        .ticket_state(HybridTime {
            physical: 12,
            counter: 34,
        })
        .unwrap();
    assert_eq!(state, TicketState::NotFound);
}

#[test]
fn checkpoints_replicate_like_entries() {
    use raft::log::LogStore;
    use raft::message::RaftLogType;

    let cluster = TestCluster::start(2);
    let leader = cluster.wait_for_leader();

    let reply = cluster.replicas[leader].handle.replicate_checkpoint().unwrap();
    assert_eq!(reply.status, OperationStatus::Success);
    let ticket = reply.ticket.unwrap();

    cluster.wait_until("the checkpoint commits", |cluster| {
        match cluster.replicas[leader].handle.ticket_state(ticket).unwrap() {
            TicketState::Committed { .. } => Some(()),
            _ => None,
        }
    });

    let logs = cluster.replicas[leader].store.read_logs_range(0, 1).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].entry_type(), RaftLogType::CommittedCheckpoint);
}

#[test]
fn commits_survive_across_batches_on_every_replica() {
    let cluster = TestCluster::start(3);
    let leader = cluster.wait_for_leader();

    for round in 0..3u8 {
        let reply = cluster.replicas[leader]
            .handle
            .replicate_logs(vec![entry("round", &[round])])
            .unwrap();
        assert_eq!(reply.status, OperationStatus::Success);
        let ticket = reply.ticket.unwrap();
        cluster.wait_until("the round commits", |cluster| {
            match cluster.replicas[leader].handle.ticket_state(ticket).unwrap() {
                TicketState::Committed { .. } => Some(()),
                _ => None,
            }
        });
    }

    // every follower eventually sees all three rounds in order
    cluster.wait_until("followers catch up", |cluster| {
        let caught_up = cluster.replicas.iter().enumerate().all(|(index, replica)| {
            index == leader || replica.events.received_count("round") >= 3
        });
        if caught_up {
            Some(())
        } else {
            None
        }
    });

    for (index, replica) in cluster.replicas.iter().enumerate() {
        if index == leader {
            continue;
        }
        let received = replica.events.received.lock().unwrap();
        let rounds: Vec<u8> = received
            .iter()
            .filter(|(kind, _)| kind == "round")
            .map(|(_, data)| data[0])
            .collect();
        assert_eq!(rounds, vec![0, 1, 2]);
    }
}
