use stitch::{
    PipeOptions, ReadableState, StreamConfig, StreamError, WritableState, chain, channel, collect,
    from_iter, pipe, tee,
};
use stitch_rt::{LocalExecutorBuilder, spawn_local};

#[test]
fn test_tee_both_branches_see_every_chunk() {
    LocalExecutorBuilder::default().run(async {
        let (first, second) = tee(from_iter(vec![1, 2, 3, 4]));

        // both branches must be read concurrently, the pump waits for the slower one
        let first = spawn_local(collect(first));
        let second = collect(second).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first, vec![1, 2, 3, 4]);
        assert_eq!(second, first);
    });
}

#[test]
fn test_tee_keeps_feeding_remaining_branch_after_cancel() {
    LocalExecutorBuilder::default().run(async {
        let (mut first, second) = tee(from_iter(vec!["a", "b", "c"]));
        first.cancel(StreamError::Canceled("not interested".into()));

        assert_eq!(collect(second).await.unwrap(), vec!["a", "b", "c"]);
    });
}

#[test]
fn test_tee_cancels_source_once_both_branches_cancel() {
    LocalExecutorBuilder::default().run(async {
        let (writable, readable) = channel::<u32>(&StreamConfig::default());
        let (first, second) = tee(readable);
        drop(first);
        drop(second);

        // the pump only notices once it has a chunk to deliver
        writable.write(1).await.unwrap();
        let err = writable.write(2).await.unwrap_err();
        assert!(matches!(err, StreamError::Canceled(_)));
    });
}

#[test]
fn test_tee_source_error_errors_both_branches() {
    LocalExecutorBuilder::default().run(async {
        let (writable, readable) = channel::<u32>(&StreamConfig::default());
        let (mut first, mut second) = tee(readable);
        writable.abort(StreamError::SourceRead("disk gone".into()));

        let expected = Err(StreamError::SourceRead("disk gone".into()));
        assert_eq!(first.read().await, expected);
        assert_eq!(second.read().await, expected);
    });
}

#[test]
fn test_chain_preserves_order_across_sources() {
    LocalExecutorBuilder::default().run(async {
        let combined = chain(vec![from_iter(vec!["a1", "a2"]), from_iter(vec!["b1"])]);
        assert_eq!(collect(combined).await.unwrap(), vec!["a1", "a2", "b1"]);
    });
}

#[test]
fn test_chain_closes_only_after_last_source() {
    LocalExecutorBuilder::default().run(async {
        let (tail_writable, tail) = channel(&StreamConfig::default());
        let mut combined = chain(vec![from_iter(vec!["head"]), tail]);

        assert_eq!(combined.read().await, Ok(Some("head")));

        let writer = spawn_local(async move {
            tail_writable.write("tail").await.unwrap();
            tail_writable.close().unwrap();
        });
        assert_eq!(combined.read().await, Ok(Some("tail")));
        assert_eq!(combined.read().await, Ok(None));
        writer.await.unwrap();
    });
}

#[test]
fn test_chain_of_nothing_is_closed() {
    LocalExecutorBuilder::default().run(async {
        let mut combined = chain::<u8>(Vec::new());
        assert_eq!(combined.read().await, Ok(None));
        assert_eq!(combined.state(), ReadableState::Closed);
    });
}

#[test]
fn test_chain_stops_at_failing_source() {
    LocalExecutorBuilder::default().run(async {
        let (broken_writable, broken) = channel::<&str>(&StreamConfig::default());
        broken_writable.abort(StreamError::SourceRead("broken".into()));

        let (never_writable, never) = channel::<&str>(&StreamConfig::default());
        let combined = chain(vec![from_iter(vec!["ok"]), broken, never]);

        // the abort may discard "ok" before it is read
        assert_eq!(
            collect(combined).await,
            Err(StreamError::SourceRead("broken".into()))
        );
        // remaining sources are canceled rather than read
        assert_eq!(never_writable.state(), WritableState::Aborted);
    });
}

#[test]
fn test_pipe_prevent_close_keeps_sink_usable() {
    LocalExecutorBuilder::default().run(async {
        let (sink, output) = channel(&StreamConfig::new().high_water_mark(8));

        pipe(from_iter(vec![1, 2]), &sink, PipeOptions::keep_open())
            .await
            .unwrap();
        assert_eq!(sink.state(), WritableState::Writable);

        pipe(from_iter(vec![3]), &sink, PipeOptions::default()).await.unwrap();
        assert_eq!(sink.state(), WritableState::Closed);
        assert!(sink.write(4).await.is_err());

        assert_eq!(collect(output).await.unwrap(), vec![1, 2, 3]);
    });
}

#[test]
fn test_pipe_read_error_aborts_sink() {
    LocalExecutorBuilder::default().run(async {
        let (source_writable, source) = channel::<u8>(&StreamConfig::default());
        source_writable.abort(StreamError::SourceRead("eof".into()));
        let (sink, mut output) = channel::<u8>(&StreamConfig::default());

        let result = pipe(source, &sink, PipeOptions::default()).await;
        assert_eq!(result, Err(StreamError::SourceRead("eof".into())));
        assert_eq!(output.read().await, Err(StreamError::SourceRead("eof".into())));
    });
}

#[test]
fn test_pipe_write_error_cancels_source() {
    LocalExecutorBuilder::default().run(async {
        let (source_writable, source) = channel::<u8>(&StreamConfig::new().high_water_mark(4));
        source_writable.enqueue(1).unwrap();
        let (sink, output) = channel::<u8>(&StreamConfig::default());
        drop(output);

        let result = pipe(source, &sink, PipeOptions::default()).await;
        assert!(matches!(result, Err(StreamError::Canceled(_))));
        assert_eq!(source_writable.state(), WritableState::Aborted);
    });
}

#[test]
fn test_from_iter_works_without_executor() {
    let readable = from_iter(vec!["x"]);
    assert_eq!(readable.state(), ReadableState::Readable);
}
