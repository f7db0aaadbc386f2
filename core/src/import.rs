use std::{io::BufRead, thread};

use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use tracing::info;

use crate::{
    index::GeometryEngine,
    spatial_index::SpatialIndex,
    storage::{point::Point, DocumentStore},
};

/// Import newline-delimited JSON points into the index. Every line must
/// contain one point. Blank lines are skipped. Returns the number of
/// imported points.
pub fn import_ndjson<S, E>(index: &SpatialIndex<S, E>, reader: impl BufRead) -> Result<usize>
where
    S: DocumentStore,
    E: GeometryEngine,
{
    thread::scope(|s| {
        // run separate thread for store
        let (store_send, store_recv) = bounded::<(usize, Point)>(16);
        let store_thread = s.spawn(move || -> Result<usize> {
            let mut count = 0;
            for (line, point) in store_recv {
                index
                    .insert_point(point)
                    .with_context(|| format!("Unable to import point in line {line}"))?;
                count += 1;
            }
            index.store().flush()?;
            Ok(count)
        });

        let mut parse_result = Ok(());
        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = match line.with_context(|| format!("Unable to read line {line_no}")) {
                Ok(line) => line,
                Err(e) => {
                    parse_result = Err(e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let point = match serde_json::from_str::<Point>(&line)
                .with_context(|| format!("Invalid point in line {line_no}"))
            {
                Ok(point) => point,
                Err(e) => {
                    parse_result = Err(e);
                    break;
                }
            };
            if store_send.send((line_no, point)).is_err() {
                // the store thread has failed
                break;
            }
        }
        drop(store_send);

        let count = match store_thread.join() {
            Ok(r) => r?,
            Err(_) => bail!("Store thread panicked"),
        };
        parse_result?;

        info!(count, "Imported points");
        Ok(count)
    })
}
