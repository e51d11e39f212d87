use std::io::SeekFrom;
use std::path::Path;

use bytes::Bytes;
use log::warn;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::extract::RecordScanner;
use crate::partition::{owned_range, sub_buffers};
use crate::shared_types::{ByteRange, Rank, Tally};

/// Extra bytes read past the end of every sub-buffer so a record that
/// straddles the boundary is still seen whole by the buffer owning its
/// first byte. Records longer than this are lost at a seam.
pub(crate) const BOUNDARY_OVERLAP: u64 = 64 * 1024;

/// Count hashtag and language occurrences over the byte range `rank` owns
/// in a `size`-rank group.
///
/// I/O failures never escape the rank: an unopenable corpus contributes an
/// empty tally, and an unreadable portion is skipped while the rest is
/// still processed. Both are logged.
pub(crate) async fn tally_range(
    corpus: &Path,
    rank: Rank,
    size: u32,
    scanner: &RecordScanner,
) -> Tally {
    let mut tally = Tally::default();

    let mut file = match File::open(corpus).await {
        Ok(file) => file,
        Err(e) => {
            warn!("rank {rank}: unable to open corpus {}: {e}", corpus.display());
            return tally;
        }
    };
    let file_size = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("rank {rank}: unable to stat corpus {}: {e}", corpus.display());
            return tally;
        }
    };

    let buffs = sub_buffers(owned_range(file_size, rank, size));
    let count = buffs.len();
    for (i, buff) in buffs.into_iter().enumerate() {
        let window = match read_window(&mut file, buff, file_size).await {
            Ok(window) => window,
            Err(e) => {
                warn!("rank {rank}: unable to read portion {i}/{count} of the corpus: {e}");
                continue;
            }
        };

        for record in scanner.records(&window) {
            // Records starting past the nominal end sit in the overlap
            // tail and belong to the next buffer.
            if record.offset as u64 >= buff.len {
                break;
            }
            for tag in record.hashtags {
                *tally.hashtags.entry(tag).or_default() += 1;
            }
            if let Some(lang) = record.language {
                *tally.languages.entry(lang).or_default() += 1;
            }
        }
    }

    tally
}

/// Read one sub-buffer plus its overlap tail, clamped to the end of the
/// file.
async fn read_window(file: &mut File, buff: ByteRange, file_size: u64) -> std::io::Result<Bytes> {
    let want = (buff.len + BOUNDARY_OVERLAP).min(file_size - buff.offset);
    file.seek(SeekFrom::Start(buff.offset)).await?;
    let mut window = vec![0u8; want as usize];
    file.read_exact(&mut window).await?;
    Ok(Bytes::from(window))
}
