use std::path::{Path, PathBuf};

use futures::future::join_all;
use log::{info, warn};

use crate::counter::tally_range;
use crate::extract::RecordScanner;
use crate::protocol::{self, Endpoint, ProcessGroup, ProtocolError};
use crate::shared_types::Tally;

/// Run a full count over `corpus` with `ranks` ranks and return the merged
/// tally. Rank 0 runs on the calling task; every other rank gets its own.
pub(crate) async fn execute(corpus: &Path, ranks: u32) -> Result<Tally, ProtocolError> {
    let mut group = protocol::link_group(ranks);
    let coordinator = group.remove(0);

    let mut handles = Vec::with_capacity(group.len());
    for pg in group {
        handles.push(tokio::spawn(run_worker(pg, corpus.to_path_buf())));
    }

    let merged = run_coordinator(coordinator, corpus).await;

    // Worker tasks end on their own once told to exit or once the
    // coordinator's links are gone.
    for join in join_all(handles).await {
        if let Err(e) = join {
            warn!("worker task failed: {e}");
        }
    }

    merged
}

async fn run_coordinator(pg: ProcessGroup, corpus: &Path) -> Result<Tally, ProtocolError> {
    let scanner = RecordScanner::new();
    let mut merged = tally_range(corpus, pg.rank, pg.size, &scanner).await;

    let Endpoint::Coordinator { mut links } = pg.endpoint else {
        unreachable!("rank 0 is always the coordinator");
    };

    if !links.is_empty() {
        info!("collecting results from {} workers", links.len());
        let collected = protocol::collect(&mut links).await?;
        for tally in &collected {
            merged.absorb(tally);
        }
        protocol::exit_workers(&mut links).await;
    }

    Ok(merged)
}

async fn run_worker(pg: ProcessGroup, corpus: PathBuf) {
    let scanner = RecordScanner::new();
    let local = tally_range(&corpus, pg.rank, pg.size, &scanner).await;

    let Endpoint::Worker(link) = pg.endpoint else {
        unreachable!("ranks above 0 are always workers");
    };

    protocol::serve(pg.rank, link, local).await;
}
