use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use bytes::Bytes;
use stitch::{
    BufferedTransform, Controller, FlushEffectTransform, InlineDataTransform, Map, Passthrough,
    PrefixTransform, StreamConfig, StreamError, SuffixTransform, TransformStage, Transformer,
    WritableState, channel, collect, decode_text, encode_text, from_iter,
};
use stitch_rt::LocalExecutorBuilder;

/// Room for every chunk a test feeds, so the pump never waits on the test.
fn roomy() -> StreamConfig {
    StreamConfig::new().high_water_mark(16)
}

fn stage<T>(transformer: T) -> TransformStage<Bytes, Bytes>
where
    T: Transformer<Bytes, Bytes> + 'static,
{
    TransformStage::with_config(transformer, &roomy())
}

/// Queues `chunks` and closes the input before the pump gets to run.
fn feed(stage: &TransformStage<Bytes, Bytes>, chunks: &[&str]) {
    for chunk in chunks {
        stage.writable().enqueue(encode_text(chunk)).unwrap();
    }
    stage.writable().close().unwrap();
}

async fn output_text(stage: TransformStage<Bytes, Bytes>) -> Vec<String> {
    let (_writable, readable) = stage.into_parts();
    collect(readable)
        .await
        .unwrap()
        .iter()
        .map(|chunk| decode_text(chunk))
        .collect()
}

#[test]
fn test_passthrough_forwards_chunks() {
    LocalExecutorBuilder::default().run(async {
        let passthrough = stage(Passthrough);
        feed(&passthrough, &["a", "b"]);
        assert_eq!(output_text(passthrough).await, vec!["a", "b"]);
    });
}

#[test]
fn test_failing_transform_aborts_output_and_cancels_input() {
    LocalExecutorBuilder::default().run(async {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let failing = stage(Map::new("Failing", move |chunk: Bytes| {
            seen.set(seen.get() + 1);
            if chunk.as_ref() == b"bad" {
                Err(StreamError::TransformCallback("bad chunk".into()))
            } else {
                Ok(chunk)
            }
        }));
        // the input stays open, so only the failure can end it
        for chunk in ["ok", "bad", "never"] {
            failing.writable().enqueue(encode_text(chunk)).unwrap();
        }

        let (writable, readable) = failing.into_parts();
        assert_eq!(
            collect(readable).await,
            Err(StreamError::TransformCallback("bad chunk".into()))
        );
        assert_eq!(calls.get(), 2);
        assert_eq!(writable.state(), WritableState::Aborted);
        assert!(writable.write(encode_text("late")).await.is_err());
    });
}

struct StopAt(&'static str);

impl Transformer<Bytes, Bytes> for StopAt {
    fn name(&self) -> &str {
        "StopAt"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        if chunk.as_ref() == self.0.as_bytes() {
            controller.terminate();
            return Ok(());
        }
        controller.enqueue(chunk)
    }
}

#[test]
fn test_terminate_closes_output_and_cancels_input() {
    LocalExecutorBuilder::default().run(async {
        let stopping = stage(StopAt("stop"));
        stopping.writable().enqueue(encode_text("a")).unwrap();
        stopping.writable().enqueue(encode_text("stop")).unwrap();
        stopping.writable().enqueue(encode_text("b")).unwrap();

        let (writable, readable) = stopping.into_parts();
        let chunks = collect(readable).await.unwrap();
        assert_eq!(chunks, vec![encode_text("a")]);
        assert_eq!(writable.state(), WritableState::Aborted);
    });
}

struct FailingFlush;

impl Transformer<Bytes, Bytes> for FailingFlush {
    fn name(&self) -> &str {
        "FailingFlush"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        controller.enqueue(chunk)
    }

    async fn flush(&mut self, _controller: &Controller<Bytes>) -> Result<(), StreamError> {
        Err(StreamError::TransformCallback("flush".into()))
    }
}

#[test]
fn test_failing_flush_errors_instead_of_closing() {
    LocalExecutorBuilder::default().run(async {
        let failing = stage(FailingFlush);
        feed(&failing, &["a"]);
        let (_writable, readable) = failing.into_parts();
        assert_eq!(
            collect(readable).await,
            Err(StreamError::TransformCallback("flush".into()))
        );
    });
}

#[test]
fn test_buffered_coalesces_chunks_from_one_turn() {
    LocalExecutorBuilder::default().run(async {
        let buffered = stage(BufferedTransform::new());
        feed(&buffered, &["a", "b", "c"]);
        assert_eq!(output_text(buffered).await, vec!["abc"]);
    });
}

#[test]
fn test_buffered_single_chunk_round_trips() {
    LocalExecutorBuilder::default().run(async {
        let buffered = stage(BufferedTransform::new());
        feed(&buffered, &["<p>héllo</p>"]);
        assert_eq!(output_text(buffered).await, vec!["<p>héllo</p>"]);
    });
}

#[test]
fn test_buffered_emits_separate_chunks_for_separate_turns() {
    LocalExecutorBuilder::default().run(async {
        let buffered = stage(BufferedTransform::new());
        let (writable, mut readable) = buffered.into_parts();

        writable.enqueue(encode_text("first")).unwrap();
        assert_eq!(readable.read().await, Ok(Some(encode_text("first"))));

        writable.enqueue(encode_text("second")).unwrap();
        writable.close().unwrap();
        assert_eq!(readable.read().await, Ok(Some(encode_text("second"))));
        assert_eq!(readable.read().await, Ok(None));
    });
}

#[test]
fn test_buffered_reassembles_split_characters() {
    LocalExecutorBuilder::default().run(async {
        let buffered = stage(BufferedTransform::new());
        let text = encode_text("日本");
        // split inside the first three-byte character
        buffered.writable().enqueue(text.slice(..1)).unwrap();
        buffered.writable().enqueue(text.slice(1..4)).unwrap();
        buffered.writable().enqueue(text.slice(4..)).unwrap();
        buffered.writable().close().unwrap();

        assert_eq!(output_text(buffered).await, vec!["日本"]);
    });
}

#[test]
fn test_buffered_forwards_incomplete_tail_raw() {
    LocalExecutorBuilder::default().run(async {
        let buffered = stage(BufferedTransform::new());
        buffered
            .writable()
            .enqueue(Bytes::from_static(&[b'a', 0xE2, 0x82]))
            .unwrap();
        buffered.writable().close().unwrap();

        let (_writable, readable) = buffered.into_parts();
        let chunks = collect(readable).await.unwrap();
        assert_eq!(
            chunks,
            vec![Bytes::from_static(b"a"), Bytes::from_static(&[0xE2, 0x82])]
        );
    });
}

#[test]
fn test_flush_effect_prepends_fresh_text_to_each_chunk() {
    LocalExecutorBuilder::default().run(async {
        let counter = Rc::new(Cell::new(0));
        let effect = stage(FlushEffectTransform::new(move || {
            let counter = counter.clone();
            async move {
                counter.set(counter.get() + 1);
                Ok::<_, StreamError>(format!("<e{}>", counter.get()))
            }
        }));
        feed(&effect, &["x", "y"]);
        assert_eq!(output_text(effect).await, vec!["<e1>x", "<e2>y"]);
    });
}

#[test]
fn test_flush_effect_finishes_one_chunk_before_the_next() {
    LocalExecutorBuilder::default().run(async {
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = log.clone();
        let effect = stage(FlushEffectTransform::new(move || {
            let events = events.clone();
            async move {
                events.borrow_mut().push("start");
                stitch_rt::next_turn().await;
                events.borrow_mut().push("end");
                Ok::<_, StreamError>(String::new())
            }
        }));
        feed(&effect, &["x", "y"]);

        // an empty effect leaves the chunk untouched
        assert_eq!(output_text(effect).await, vec!["x", "y"]);
        assert_eq!(*log.borrow(), vec!["start", "end", "start", "end"]);
    });
}

#[test]
fn test_flush_effect_failure_fails_stage() {
    LocalExecutorBuilder::default().run(async {
        let effect = stage(FlushEffectTransform::new(|| async {
            Err::<String, _>(StreamError::TransformCallback("no effect".into()))
        }));
        feed(&effect, &["x"]);
        let (_writable, readable) = effect.into_parts();
        assert_eq!(
            collect(readable).await,
            Err(StreamError::TransformCallback("no effect".into()))
        );
    });
}

#[test]
fn test_prefix_emitted_once_for_empty_stream() {
    LocalExecutorBuilder::default().run(async {
        let prefix = stage(PrefixTransform::new("P"));
        feed(&prefix, &[]);
        assert_eq!(output_text(prefix).await, vec!["P"]);
    });
}

#[test]
fn test_prefix_emitted_once_after_first_chunk() {
    LocalExecutorBuilder::default().run(async {
        let prefix = stage(PrefixTransform::new("P"));
        feed(&prefix, &["a", "b", "c"]);

        let output = output_text(prefix).await;
        assert_eq!(output.iter().filter(|chunk| *chunk == "P").count(), 1);
        assert_eq!(output[0], "a");

        let primary: Vec<_> = output.iter().filter(|chunk| *chunk != "P").collect();
        assert_eq!(primary, vec!["a", "b", "c"]);
    });
}

#[test]
fn test_empty_prefix_emits_nothing() {
    LocalExecutorBuilder::default().run(async {
        let prefix = stage(PrefixTransform::new(""));
        feed(&prefix, &["a"]);
        assert_eq!(output_text(prefix).await, vec!["a"]);
    });
}

#[test]
fn test_suffix_only_at_end() {
    LocalExecutorBuilder::default().run(async {
        let suffix = stage(SuffixTransform::new("S"));
        feed(&suffix, &["a", "b"]);
        assert_eq!(output_text(suffix).await, vec!["a", "b", "S"]);

        let suffix = stage(SuffixTransform::new("S"));
        feed(&suffix, &[]);
        assert_eq!(output_text(suffix).await, vec!["S"]);

        let suffix = stage(SuffixTransform::new(""));
        feed(&suffix, &["a"]);
        assert_eq!(output_text(suffix).await, vec!["a"]);
    });
}

#[test]
fn test_inline_data_follows_first_chunk_in_order() {
    LocalExecutorBuilder::default().run(async {
        let side = from_iter(vec![encode_text("x"), encode_text("y"), encode_text("z")]);
        let inline = stage(InlineDataTransform::new(side));
        feed(&inline, &["A"]);
        assert_eq!(output_text(inline).await, vec!["A", "x", "y", "z"]);
    });
}

#[test]
fn test_inline_data_holds_stream_open_until_side_stream_ends() {
    LocalExecutorBuilder::default().run(async {
        let (side_writable, side) = channel(&roomy());
        let inline = stage(InlineDataTransform::new(side));
        feed(&inline, &["A"]);
        let (_writable, mut readable) = inline.into_parts();

        assert_eq!(readable.read().await, Ok(Some(encode_text("A"))));

        side_writable.enqueue(encode_text("x")).unwrap();
        assert_eq!(readable.read().await, Ok(Some(encode_text("x"))));

        side_writable.close().unwrap();
        assert_eq!(readable.read().await, Ok(None));
    });
}

#[test]
fn test_inline_data_cancels_side_stream_when_output_is_canceled() {
    LocalExecutorBuilder::default().run(async {
        let (side_writable, side) = channel::<Bytes>(&roomy());
        let inline = stage(InlineDataTransform::new(side));
        inline.writable().enqueue(encode_text("A")).unwrap();
        let (_writable, mut readable) = inline.into_parts();

        assert_eq!(readable.read().await, Ok(Some(encode_text("A"))));
        // the drain starts one turn after the first chunk and waits on the side stream
        stitch_rt::next_turn().await;
        assert_eq!(side_writable.state(), WritableState::Writable);

        readable.cancel(StreamError::Canceled("client went away".into()));
        stitch_rt::next_turn().await;
        assert_eq!(side_writable.state(), WritableState::Aborted);
    });
}

#[test]
fn test_inline_data_drained_even_without_primary_chunks() {
    LocalExecutorBuilder::default().run(async {
        let side = from_iter(vec![encode_text("x")]);
        let inline = stage(InlineDataTransform::new(side));
        feed(&inline, &[]);
        assert_eq!(output_text(inline).await, vec!["x"]);
    });
}

#[test]
fn test_inline_data_side_error_fails_stage() {
    LocalExecutorBuilder::default().run(async {
        let (side_writable, side) = channel::<Bytes>(&roomy());
        side_writable.abort(StreamError::SourceRead("gone".into()));
        let inline = stage(InlineDataTransform::new(side));
        feed(&inline, &["A"]);

        let (_writable, readable) = inline.into_parts();
        assert!(matches!(
            collect(readable).await,
            Err(StreamError::SideStream(_))
        ));
    });
}
