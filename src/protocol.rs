use log::{debug, info};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::shared_types::{Rank, Tally};

/// Traffic between the coordinator and a worker. One tagged type instead
/// of stringly control messages, so every state handles the full set.
#[derive(Clone, Debug)]
pub(crate) enum Message {
    /// Coordinator asks a worker for its tally.
    ReturnData,
    /// Coordinator tells a worker to terminate.
    Exit,
    /// A worker's tally, answering `ReturnData`.
    Results(Tally),
}

/// Links hold one message in flight; a second send awaits the receiver.
const LINK_DEPTH: usize = 1;

/// Coordinator-side endpoint of the link pair to one worker.
pub(crate) struct WorkerLink {
    control_tx: mpsc::Sender<Message>,
    results_rx: mpsc::Receiver<Message>,
}

/// Worker-side endpoint of its link pair to the coordinator.
pub(crate) struct CoordinatorLink {
    control_rx: mpsc::Receiver<Message>,
    results_tx: mpsc::Sender<Message>,
}

/// Role-specific communication surface of one rank.
pub(crate) enum Endpoint {
    /// Rank 0. `links[i]` reaches rank `i + 1`.
    Coordinator { links: Vec<WorkerLink> },
    Worker(CoordinatorLink),
}

/// One rank's view of the group: its identity and the links it may use.
/// Built once by [`link_group`] and passed around explicitly; there is no
/// process-wide communicator.
pub(crate) struct ProcessGroup {
    pub(crate) rank: Rank,
    pub(crate) size: u32,
    pub(crate) endpoint: Endpoint,
}

#[derive(Debug, Error)]
pub(crate) enum ProtocolError {
    #[error("worker {0} hung up before delivering results")]
    Disconnected(Rank),
}

/// Wire up a `size`-rank group. Returns one value per rank, coordinator
/// first. Membership is fixed for the lifetime of the run.
pub(crate) fn link_group(size: u32) -> Vec<ProcessGroup> {
    assert!(size >= 1, "a group needs at least one rank");

    let mut links = Vec::new();
    let mut workers = Vec::new();
    for rank in 1..size {
        let (control_tx, control_rx) = mpsc::channel(LINK_DEPTH);
        let (results_tx, results_rx) = mpsc::channel(LINK_DEPTH);
        links.push(WorkerLink {
            control_tx,
            results_rx,
        });
        workers.push(ProcessGroup {
            rank,
            size,
            endpoint: Endpoint::Worker(CoordinatorLink {
                control_rx,
                results_tx,
            }),
        });
    }

    let mut group = vec![ProcessGroup {
        rank: 0,
        size,
        endpoint: Endpoint::Coordinator { links },
    }];
    group.extend(workers);
    group
}

/// Request every worker's tally, then receive the answers, both passes in
/// increasing rank order. A slow worker holds up the collection of every
/// later rank; delivery cannot race because each worker blocks on its own
/// control link until contacted.
pub(crate) async fn collect(links: &mut [WorkerLink]) -> Result<Vec<Tally>, ProtocolError> {
    for (i, link) in links.iter().enumerate() {
        let worker = i as Rank + 1;
        info!("requesting results from worker {worker}");
        link.control_tx
            .send(Message::ReturnData)
            .await
            .map_err(|_| ProtocolError::Disconnected(worker))?;
    }

    let mut tallies = Vec::with_capacity(links.len());
    for (i, link) in links.iter_mut().enumerate() {
        let worker = i as Rank + 1;
        loop {
            match link.results_rx.recv().await {
                Some(Message::Results(tally)) => {
                    info!("received results from worker {worker}");
                    tallies.push(tally);
                    break;
                }
                Some(other) => {
                    debug!("ignoring unexpected message from worker {worker}: {other:?}")
                }
                None => return Err(ProtocolError::Disconnected(worker)),
            }
        }
    }

    Ok(tallies)
}

/// Tell every worker to terminate, in increasing rank order. A worker
/// already gone by now is not an error.
pub(crate) async fn exit_workers(links: &mut [WorkerLink]) {
    for (i, link) in links.iter().enumerate() {
        let worker = i as Rank + 1;
        info!("sending exit signal to worker {worker}");
        if link.control_tx.send(Message::Exit).await.is_err() {
            debug!("worker {worker} was gone before the exit signal");
        }
    }
}

/// Worker loop: serve a clone of the held tally on every `ReturnData`,
/// terminate on `Exit` or when the coordinator's end of the link closes.
/// Anything else is dropped without a state change.
pub(crate) async fn serve(rank: Rank, mut link: CoordinatorLink, tally: Tally) {
    loop {
        match link.control_rx.recv().await {
            Some(Message::ReturnData) => {
                if link
                    .results_tx
                    .send(Message::Results(tally.clone()))
                    .await
                    .is_err()
                {
                    debug!("rank {rank}: coordinator hung up mid-delivery");
                    break;
                }
            }
            Some(Message::Exit) | None => break,
            Some(other) => debug!("rank {rank}: ignoring message {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(tag: &str) -> Tally {
        let mut tally = Tally::default();
        tally.hashtags.insert(tag.to_string(), 1);
        tally
    }

    #[test]
    fn group_of_one_has_no_links() {
        let group = link_group(1);

        assert_eq!(group.len(), 1);
        assert_eq!(group[0].rank, 0);
        assert_eq!(group[0].size, 1);
        match &group[0].endpoint {
            Endpoint::Coordinator { links } => assert!(links.is_empty()),
            Endpoint::Worker(_) => panic!("rank 0 must coordinate"),
        }
    }

    #[test]
    fn group_ranks_are_dense_and_ordered() {
        let group = link_group(4);

        assert_eq!(group.len(), 4);
        for (i, pg) in group.iter().enumerate() {
            assert_eq!(pg.rank, i as Rank);
            assert_eq!(pg.size, 4);
        }
        assert!(matches!(group[0].endpoint, Endpoint::Coordinator { .. }));
        for pg in &group[1..] {
            assert!(matches!(pg.endpoint, Endpoint::Worker(_)));
        }
    }

    #[tokio::test]
    async fn collects_every_worker_in_rank_order() {
        let mut group = link_group(4);
        let coordinator = group.remove(0);

        let mut handles = vec![];
        for pg in group {
            let tally = marker(&format!("w{}", pg.rank));
            let Endpoint::Worker(link) = pg.endpoint else {
                panic!("expected worker endpoint");
            };
            handles.push(tokio::spawn(serve(pg.rank, link, tally)));
        }

        let Endpoint::Coordinator { mut links } = coordinator.endpoint else {
            panic!("expected coordinator endpoint");
        };

        let tallies = collect(&mut links).await.expect("all workers answer");
        assert_eq!(tallies.len(), 3);
        for (i, tally) in tallies.iter().enumerate() {
            assert!(tally.hashtags.contains_key(&format!("w{}", i + 1)));
        }

        exit_workers(&mut links).await;
        for handle in handles {
            handle.await.expect("worker terminates after exit");
        }
    }

    #[tokio::test]
    async fn empty_link_set_exchanges_no_messages() {
        let tallies = collect(&mut []).await.expect("nothing to collect");
        assert!(tallies.is_empty());
        exit_workers(&mut []).await;
    }

    #[tokio::test]
    async fn worker_ignores_unexpected_control_messages() {
        let mut group = link_group(2);
        let coordinator = group.remove(0);
        let worker = group.remove(0);

        let Endpoint::Worker(link) = worker.endpoint else {
            panic!("expected worker endpoint");
        };
        let handle = tokio::spawn(serve(1, link, marker("w1")));

        let Endpoint::Coordinator { mut links } = coordinator.endpoint else {
            panic!("expected coordinator endpoint");
        };

        // A payload message on the control link is not a request; the
        // worker must stay in its waiting state and answer the real
        // request that follows.
        links[0]
            .control_tx
            .send(Message::Results(Tally::default()))
            .await
            .expect("worker is listening");

        let tallies = collect(&mut links).await.expect("worker still answers");
        assert_eq!(tallies.len(), 1);
        assert!(tallies[0].hashtags.contains_key("w1"));

        exit_workers(&mut links).await;
        handle.await.expect("worker terminates");
    }

    #[tokio::test]
    async fn vanished_worker_surfaces_as_disconnect() {
        let mut group = link_group(3);
        let coordinator = group.remove(0);

        // Rank 1 answers; rank 2's endpoint is dropped without ever serving.
        let pg1 = group.remove(0);
        let Endpoint::Worker(link1) = pg1.endpoint else {
            panic!("expected worker endpoint");
        };
        tokio::spawn(serve(1, link1, marker("w1")));
        drop(group);

        let Endpoint::Coordinator { mut links } = coordinator.endpoint else {
            panic!("expected coordinator endpoint");
        };

        match collect(&mut links).await {
            Err(ProtocolError::Disconnected(2)) => {}
            other => panic!("expected disconnect of worker 2, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn worker_serves_repeated_requests() {
        let mut group = link_group(2);
        let coordinator = group.remove(0);
        let worker = group.remove(0);

        let Endpoint::Worker(link) = worker.endpoint else {
            panic!("expected worker endpoint");
        };
        let handle = tokio::spawn(serve(1, link, marker("w1")));

        let Endpoint::Coordinator { mut links } = coordinator.endpoint else {
            panic!("expected coordinator endpoint");
        };

        for _ in 0..2 {
            let tallies = collect(&mut links).await.expect("worker answers again");
            assert_eq!(tallies.len(), 1);
        }

        exit_workers(&mut links).await;
        handle.await.expect("worker terminates");
    }
}
