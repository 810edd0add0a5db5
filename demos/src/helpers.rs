use std::io::Write;

use futures::channel::oneshot;
use log::{LevelFilter, trace};
use stitch::{ReadableStream, RenderedStream, StreamConfig, StreamError, channel, encode_text};
use stitch_rt::{next_turn, spawn_local};

/// Installs an env_logger that prints file, line, level and a wall-clock timestamp.
pub fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

/// Renders `parts` one per executor turn, like a server rendering a page piecemeal.
///
/// The returned stream carries an all-ready signal that fires once the last part has
/// been written.
pub fn fake_renderer(parts: Vec<String>) -> RenderedStream {
    let (writable, readable) = channel(&StreamConfig::default());
    let (done_tx, done_rx) = oneshot::channel();

    spawn_local(async move {
        for part in parts {
            trace!("rendered {} bytes", part.len());
            if writable.write(encode_text(&part)).await.is_err() {
                return;
            }
            next_turn().await;
        }
        let _ = writable.close();
        let _ = done_tx.send(());
    })
    .detach();

    RenderedStream::new(readable).with_all_ready(async move {
        done_rx
            .await
            .map_err(|_| StreamError::SourceRead("renderer stopped early".to_owned()))
    })
}

/// Streams each payload as an inline `<script>` tag, yielding between tags.
pub fn script_data(payloads: Vec<String>) -> ReadableStream<bytes::Bytes> {
    let (writable, readable) = channel(&StreamConfig::default());

    spawn_local(async move {
        for payload in payloads {
            let tag = format!("<script>self.__data.push({payload})</script>");
            if writable.write(encode_text(&tag)).await.is_err() {
                return;
            }
            next_turn().await;
        }
        let _ = writable.close();
    })
    .detach();

    readable
}
