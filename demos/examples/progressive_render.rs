use clap::Parser;
use log::info;
use std::{io::Write, str::FromStr};

use demos::helpers::{fake_renderer, init_logger, script_data};
use stitch::{Pipeline, StreamConfig, StreamError, decode_text};
use stitch_rt::LocalExecutorBuilder;

#[derive(Parser)]
#[command(name = "Progressive Render")]
#[command(version = "0.0.0")]
#[command(about = "Streams a rendered page through a stitch pipeline", long_about = None)]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    /// Wait for the whole page before writing anything.
    #[arg(long)]
    full_buffering: bool,
    /// Forward rendered chunks as they come instead of coalescing them.
    #[arg(long)]
    unbuffered: bool,
    /// Number of inline data payloads merged into the page.
    #[arg(long, default_value_t = 3)]
    payloads: usize,
    #[arg(long, default_value_t = 1)]
    high_water_mark: usize,
    #[arg(long, default_value_t = format!("INFO"))]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_level = log::LevelFilter::from_str(&cli.log_level)?;
    if cli.debug {
        init_logger(log_level);
    }

    LocalExecutorBuilder::default().run(async move {
        let rendered = fake_renderer(vec![
            "<!DOCTYPE html><html><head><title>stitch</title></head><body>".to_owned(),
            "<header>progressive render</header>".to_owned(),
            "<main><p>first section</p>".to_owned(),
            "<p>second section</p></main>".to_owned(),
        ]);
        let data = script_data((0..cli.payloads).map(|n| format!("{{\"id\":{n}}}")).collect());

        let mut styles = 0;
        let pipeline = Pipeline::new()
            .config(StreamConfig::new().high_water_mark(cli.high_water_mark))
            .buffered(!cli.unbuffered)
            .full_buffering(cli.full_buffering)
            .flush_effect(move || {
                styles += 1;
                let style = if styles == 1 {
                    "<style>main{margin:0}</style>".to_owned()
                } else {
                    String::new()
                };
                async move { Ok::<_, StreamError>(style) }
            })
            .inline_data(data)
            .document_suffix("<script>self.__boot()</script></body></html>");
        info!("stages: {:?}", pipeline.stage_names());

        let mut output = pipeline.run(rendered).await?;

        let mut stdout = std::io::stdout();
        let mut chunks = 0;
        while let Some(chunk) = output.read().await? {
            chunks += 1;
            info!("chunk {} ({} bytes)", chunks, chunk.len());
            writeln!(stdout, "{}", decode_text(&chunk))?;
        }
        info!("page complete after {} chunks", chunks);

        Ok::<_, anyhow::Error>(())
    })
}
