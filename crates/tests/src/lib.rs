//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 背压策略场景测试 (lossless 阻塞、detach 摘除、全部失败、取消)
//! - 缓冲池记账与幂等性
//! - 配置文件到文件输出的端到端测试

#[cfg(test)]
mod support {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{ChunkWriter, ContractError};
    use tee::ReaderSource;
    use tokio::sync::watch;

    /// Source over an owned byte vector
    pub fn source(data: Vec<u8>) -> ReaderSource<Cursor<Vec<u8>>> {
        ReaderSource::new("mem", Cursor::new(data))
    }

    pub fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    /// How a [`ScriptedSink`] behaves on each write
    #[derive(Clone)]
    pub enum Behaviour {
        /// Accept immediately
        Fast,
        /// Wait for the gate to open, then accept
        Gated(watch::Receiver<bool>),
        /// Never return
        Hang,
        /// Sleep, then accept
        Slow(Duration),
        /// Fail from the given write index on
        FailFrom(u64),
        /// Panic on the first write
        Panic,
    }

    /// Sink recording every byte it accepts
    #[derive(Clone)]
    pub struct ScriptedSink {
        behaviour: Behaviour,
        pub data: Arc<Mutex<Vec<u8>>>,
        pub calls: Arc<AtomicU64>,
        pub closes: Arc<AtomicU64>,
    }

    impl ScriptedSink {
        pub fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                data: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(AtomicU64::new(0)),
                closes: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn bytes(&self) -> Vec<u8> {
            self.data.lock().unwrap().clone()
        }

        pub fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn closes(&self) -> u64 {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl ChunkWriter for ScriptedSink {
        async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match &mut self.behaviour {
                Behaviour::Fast => {}
                Behaviour::Gated(gate) => {
                    let _ = gate.wait_for(|open| *open).await;
                }
                Behaviour::Hang => std::future::pending::<()>().await,
                Behaviour::Slow(delay) => tokio::time::sleep(*delay).await,
                Behaviour::FailFrom(n) => {
                    if call >= *n {
                        return Err(ContractError::sink_write("scripted", "injected failure"));
                    }
                }
                Behaviour::Panic => panic!("injected sink panic"),
            }
            self.data.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Poll `cond` every few milliseconds until it holds or `limit` passes
    pub async fn eventually(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cond()
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConfigVersion, Policy, SinkType, DEFAULT_CHUNK_SIZE};

    /// Omitted fields take their defaults and survive a TOML round trip
    #[test]
    fn test_blueprint_defaults_round_trip() {
        let json = r#"{ "outputs": [{ "name": "only", "sink": { "sink_type": "null" } }] }"#;
        let bp = ConfigFormat::Json.parse(json).unwrap();

        assert_eq!(bp.version, ConfigVersion::V1);
        assert_eq!(bp.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(bp.pool_size, None);
        let output = &bp.outputs[0].output;
        assert_eq!(output.policy, Policy::Lossless);
        assert_eq!(output.queue_depth, 16);
        assert_eq!(output.stall_timeout_ms, 1000);
        assert_eq!(bp.outputs[0].sink.sink_type, SinkType::Null);
        assert!(bp.outputs[0].sink.params.is_empty());
        assert_eq!(bp.resolved_pool_size(), 16 + 1 + 1);

        let toml = ConfigLoader::to_toml(&bp).unwrap();
        let back = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(back.version, bp.version);
        assert_eq!(back.chunk_size, bp.chunk_size);
        assert_eq!(back.pool_size, None);
        assert_eq!(back.output_configs(), bp.output_configs());
        assert_eq!(back.outputs[0].sink.sink_type, SinkType::Null);
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::time::{Duration, Instant};

    use tee::{CancellationToken, Output, OutputConfig, OutputError, Policy, Tee, TeeError};
    use tokio::sync::watch;

    use crate::support::{eventually, pattern, source, Behaviour, ScriptedSink};

    /// Lossless output blocked behind a stuck write holds the distributor;
    /// the lossy output still gets everything read so far and, once the
    /// gate opens, the whole stream without a single drop.
    #[tokio::test]
    async fn test_lossless_blocks_lossy_proceeds() {
        let (open, gate) = watch::channel(false);
        let slow = ScriptedSink::new(Behaviour::Gated(gate));
        let fast = ScriptedSink::new(Behaviour::Fast);

        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("lossless", Policy::Lossless).with_queue_depth(1),
                slow.clone(),
            ))
            .output(Output::new(
                OutputConfig::new("lossy", Policy::Lossy).with_queue_depth(4),
                fast.clone(),
            ))
            .build()
            .unwrap();
        let monitors = tee.monitors();

        let run = tokio::spawn(tee.run(source(pattern(10)), CancellationToken::new()));

        // Chunk 0 is being written, chunk 1 queued, chunk 2 waits for space.
        assert!(eventually(Duration::from_secs(2), || monitors[1].written() == 3).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(monitors[0].written(), 0);
        assert_eq!(monitors[1].written(), 3);
        assert!(!run.is_finished());

        open.send(true).unwrap();
        let outcome = run.await.unwrap();

        assert!(outcome.status.is_ok());
        let lossy = outcome.report("lossy").unwrap();
        assert_eq!(lossy.written, 10);
        assert_eq!(lossy.dropped, 0);
        assert_eq!(fast.bytes(), pattern(10));
        assert_eq!(slow.bytes(), pattern(10));
        assert_eq!(outcome.pool.outstanding(), 0);
    }

    /// Same layout, bounded by cancellation instead of the gate opening
    #[tokio::test]
    async fn test_lossless_blocked_then_cancelled() {
        let (open, gate) = watch::channel(false);
        let slow = ScriptedSink::new(Behaviour::Gated(gate));
        let fast = ScriptedSink::new(Behaviour::Fast);

        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("lossless", Policy::Lossless).with_queue_depth(1),
                slow.clone(),
            ))
            .output(Output::new(
                OutputConfig::new("lossy", Policy::Lossy).with_queue_depth(4),
                fast.clone(),
            ))
            .build()
            .unwrap();
        let monitors = tee.monitors();
        let cancel = CancellationToken::new();

        let run = tokio::spawn(tee.run(source(pattern(10)), cancel.clone()));
        assert!(eventually(Duration::from_secs(2), || monitors[1].written() == 3).await);

        cancel.cancel();
        // The worker still owes chunk 0 and chunk 1; let it finish them.
        open.send(true).unwrap();
        let outcome = run.await.unwrap();

        assert!(matches!(outcome.status, Err(TeeError::Cancelled)));
        assert_eq!(outcome.chunks_read, 3);
        let lossless = outcome.report("lossless").unwrap();
        assert_eq!(lossless.written, 2);
        assert_eq!(lossless.dropped, 1);
        assert_eq!(outcome.report("lossy").unwrap().written, 3);
        assert_eq!(outcome.pool.outstanding(), 0);
    }

    /// A sink whose writes never return is detached after its stall
    /// timeout; the healthy output still gets the whole stream.
    #[tokio::test]
    async fn test_detach_fires_on_stall() {
        let stuck = ScriptedSink::new(Behaviour::Hang);
        let healthy = ScriptedSink::new(Behaviour::Fast);

        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("stuck", Policy::Detach)
                    .with_queue_depth(2)
                    .with_stall_timeout(Duration::from_millis(50)),
                stuck.clone(),
            ))
            .output(Output::new(
                OutputConfig::new("healthy", Policy::Lossless).with_queue_depth(4),
                healthy.clone(),
            ))
            .build()
            .unwrap();

        let started = Instant::now();
        let outcome = tee.run(source(pattern(20)), CancellationToken::new()).await;
        assert!(started.elapsed() >= Duration::from_millis(50));

        assert!(outcome.status.is_ok());
        let stuck_report = outcome.report("stuck").unwrap();
        assert!(stuck_report.detached);
        assert!(matches!(stuck_report.error, Some(OutputError::Stalled { .. })));
        assert_eq!(stuck_report.written, 0);
        assert_eq!(stuck_report.dropped, 1);
        // Only the first write ever reached the sink; close still ran once.
        assert_eq!(stuck.calls(), 1);
        assert_eq!(stuck.closes(), 1);

        let healthy_report = outcome.report("healthy").unwrap();
        assert!(healthy_report.is_clean());
        assert_eq!(healthy_report.written, 20);
        assert_eq!(healthy.bytes(), pattern(20));
        assert_eq!(outcome.pool.outstanding(), 0);
    }

    /// Counters of a detached output stop moving at the detach instant
    #[tokio::test]
    async fn test_detached_counters_frozen() {
        let stuck = ScriptedSink::new(Behaviour::Hang);
        let slow = ScriptedSink::new(Behaviour::Slow(Duration::from_millis(2)));

        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("stuck", Policy::Detach)
                    .with_queue_depth(1)
                    .with_stall_timeout(Duration::from_millis(20)),
                stuck.clone(),
            ))
            .output(Output::new(
                OutputConfig::new("slow", Policy::Lossless).with_queue_depth(1),
                slow,
            ))
            .build()
            .unwrap();
        let monitors = tee.monitors();

        let run = tokio::spawn(tee.run(source(pattern(100)), CancellationToken::new()));
        assert!(eventually(Duration::from_secs(2), || monitors[0].is_detached()).await);
        let frozen = (monitors[0].written(), monitors[0].dropped());

        let outcome = run.await.unwrap();
        let report = outcome.report("stuck").unwrap();
        assert_eq!((report.written, report.dropped), frozen);
        assert_eq!(stuck.calls(), 1);
        assert_eq!(outcome.report("slow").unwrap().written, 100);
    }

    /// A byte-stream sink stuck mid-chunk keeps whatever prefix it took;
    /// the written counter does not include it.
    #[tokio::test]
    async fn test_detach_abandon_leaves_uncounted_prefix() {
        use tokio::io::AsyncReadExt;

        let (client, mut server) = tokio::io::duplex(4);
        let healthy = ScriptedSink::new(Behaviour::Fast);

        let tee = Tee::builder(16)
            .output(Output::new(
                OutputConfig::new("pipe", Policy::Detach)
                    .with_queue_depth(1)
                    .with_stall_timeout(Duration::from_millis(30)),
                tee::WriterSink::new("pipe", client),
            ))
            .output(Output::new(OutputConfig::new("healthy", Policy::Lossless), healthy.clone()))
            .build()
            .unwrap();

        let outcome = tee.run(source(pattern(64)), CancellationToken::new()).await;
        assert!(outcome.status.is_ok());

        let report = outcome.report("pipe").unwrap();
        assert!(report.detached);
        assert!(matches!(report.error, Some(OutputError::Stalled { .. })));
        assert_eq!(report.written, 0);

        let mut landed = Vec::new();
        server.read_to_end(&mut landed).await.unwrap();
        assert_eq!(landed, pattern(4));
        assert_eq!(healthy.bytes(), pattern(64));
    }

    /// The only output fails; the distributor notices and stops early
    #[tokio::test]
    async fn test_all_outputs_failed() {
        let failing = ScriptedSink::new(Behaviour::FailFrom(2));

        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("only", Policy::Lossless).with_queue_depth(1),
                failing.clone(),
            ))
            .build()
            .unwrap();

        let outcome = tee.run(source(pattern(100)), CancellationToken::new()).await;

        assert!(matches!(outcome.status, Err(TeeError::AllOutputsFailed)));
        assert!(outcome.chunks_read < 100);
        let report = outcome.report("only").unwrap();
        assert!(report.failed);
        assert!(matches!(report.error, Some(OutputError::Write(_))));
        assert_eq!(report.written, 2);
        assert_eq!(failing.bytes(), pattern(2));
        // Failed chunks are drained, not written.
        assert_eq!(failing.calls(), 3);
        assert_eq!(failing.closes(), 1);
        assert_eq!(outcome.pool.outstanding(), 0);
    }

    /// One failing output does not disturb the other
    #[tokio::test]
    async fn test_failure_is_isolated() {
        let failing = ScriptedSink::new(Behaviour::FailFrom(0));
        let healthy = ScriptedSink::new(Behaviour::Fast);

        let tee = Tee::builder(4)
            .output(Output::new(OutputConfig::new("bad", Policy::Lossless), failing))
            .output(Output::new(OutputConfig::new("good", Policy::Lossless), healthy.clone()))
            .build()
            .unwrap();

        let outcome = tee.run(source(pattern(400)), CancellationToken::new()).await;
        assert!(outcome.status.is_ok());
        assert!(!outcome.is_success());
        assert!(outcome.report("bad").unwrap().failed);
        assert_eq!(outcome.report("bad").unwrap().written, 0);
        assert_eq!(outcome.report("good").unwrap().written, 400);
        assert_eq!(healthy.bytes(), pattern(400));
    }

    /// Cancellation while a lossless dispatch waits for space
    #[tokio::test]
    async fn test_cancel_mid_run() {
        let slow = ScriptedSink::new(Behaviour::Slow(Duration::from_millis(100)));

        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("slow", Policy::Lossless).with_queue_depth(1),
                slow.clone(),
            ))
            .build()
            .unwrap();
        let pool = tee.pool();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = tee.run(source(pattern(1000)), cancel).await;

        assert!(matches!(outcome.status, Err(TeeError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        let report = outcome.report("slow").unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.written, 2);
        assert_eq!(slow.closes(), 1);

        let stats = pool.stats();
        assert_eq!(stats.acquired, stats.released);
        assert_eq!(outcome.pool.outstanding(), 0);
    }

    /// A panicking sink is reported, the other output is unaffected
    #[tokio::test]
    async fn test_worker_panic_is_reported() {
        let panicking = ScriptedSink::new(Behaviour::Panic);
        let healthy = ScriptedSink::new(Behaviour::Fast);

        let tee = Tee::builder(8)
            .output(Output::new(OutputConfig::new("boom", Policy::Lossless), panicking))
            .output(Output::new(OutputConfig::new("fine", Policy::Lossless), healthy.clone()))
            .build()
            .unwrap();

        let outcome = tee.run(source(pattern(256)), CancellationToken::new()).await;
        assert!(outcome.status.is_ok());
        let boom = outcome.report("boom").unwrap();
        assert!(boom.failed);
        assert!(matches!(boom.error, Some(OutputError::WorkerPanicked)));
        assert_eq!(healthy.bytes(), pattern(256));
        assert_eq!(outcome.pool.outstanding(), 0);
    }
}

#[cfg(test)]
mod pool_tests {
    use std::time::Duration;

    use tee::{CancellationToken, Output, OutputConfig, Policy, Tee};

    use crate::support::{pattern, source, Behaviour, ScriptedSink};

    /// Every buffer comes back, whatever mix of policies and failures
    #[tokio::test]
    async fn test_pool_balanced_across_policies() {
        let tee = Tee::builder(16)
            .pool_size(1)
            .output(Output::new(
                OutputConfig::new("lossless", Policy::Lossless).with_queue_depth(2),
                ScriptedSink::new(Behaviour::Fast),
            ))
            .output(Output::new(
                OutputConfig::new("lossy", Policy::Lossy).with_queue_depth(1),
                ScriptedSink::new(Behaviour::Slow(Duration::from_millis(1))),
            ))
            .output(Output::new(
                OutputConfig::new("detach", Policy::Detach)
                    .with_queue_depth(1)
                    .with_stall_timeout(Duration::from_millis(10)),
                ScriptedSink::new(Behaviour::Hang),
            ))
            .output(Output::new(
                OutputConfig::new("failing", Policy::Lossless).with_queue_depth(3),
                ScriptedSink::new(Behaviour::FailFrom(5)),
            ))
            .build()
            .unwrap();

        let outcome = tee.run(source(pattern(16 * 200)), CancellationToken::new()).await;

        assert!(outcome.status.is_ok());
        assert_eq!(outcome.chunks_read, 200);
        assert_eq!(outcome.pool.acquired, outcome.pool.released);
        // The stalled detach output alone pins two buffers.
        assert!(outcome.pool.misses > 0);

        let lossy = outcome.report("lossy").unwrap();
        assert_eq!(lossy.written / 16 + lossy.dropped, 200);
        assert_eq!(outcome.report("lossless").unwrap().written, 16 * 200);
        assert!(outcome.report("detach").unwrap().detached);
        assert!(outcome.report("failing").unwrap().failed);
    }

    /// Zero live outputs: the buffer of the final read goes straight back
    #[tokio::test]
    async fn test_pool_balanced_when_no_output_left() {
        let tee = Tee::builder(1)
            .output(Output::new(
                OutputConfig::new("a", Policy::Lossless).with_queue_depth(1),
                ScriptedSink::new(Behaviour::FailFrom(0)),
            ))
            .output(Output::new(
                OutputConfig::new("b", Policy::Lossy).with_queue_depth(1),
                ScriptedSink::new(Behaviour::FailFrom(0)),
            ))
            .build()
            .unwrap();

        let outcome = tee.run(source(pattern(500)), CancellationToken::new()).await;
        assert!(outcome.status.is_err());
        assert_eq!(outcome.pool.outstanding(), 0);
        // One acquisition more than chunks read: the read nobody could take.
        assert_eq!(outcome.pool.acquired, outcome.chunks_read + 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{OutputConfig, OutputSpec, Policy, SinkConfig, SinkType, TeeBlueprint};
    use tee::{create_tee, CancellationToken};

    use crate::support::{pattern, source};

    fn file_output(name: &str, policy: Policy, path: &std::path::Path) -> OutputSpec {
        let mut params = HashMap::new();
        params.insert("path".to_string(), path.to_string_lossy().into_owned());
        OutputSpec {
            output: OutputConfig::new(name, policy).with_queue_depth(2),
            sink: SinkConfig {
                sink_type: SinkType::File,
                params,
            },
        }
    }

    /// Two fresh tees over the same input give byte-identical lossless copies
    #[tokio::test]
    async fn test_idempotent_lossless_copies() {
        let dir = tempfile::tempdir().unwrap();
        let input = pattern(10_000);

        let mut copies = Vec::new();
        for run in 0..2 {
            let path = dir.path().join(format!("run{run}.bin"));
            let blueprint = TeeBlueprint {
                version: Default::default(),
                chunk_size: 333,
                pool_size: None,
                outputs: vec![
                    file_output("copy", Policy::Lossless, &path),
                    OutputSpec {
                        output: OutputConfig::new("tap", Policy::Lossy).with_queue_depth(1),
                        sink: SinkConfig {
                            sink_type: SinkType::Log,
                            params: HashMap::new(),
                        },
                    },
                ],
            };
            ConfigLoader::validate(&blueprint).unwrap();

            let tee = create_tee(&blueprint).await.unwrap();
            let outcome = tee.run(source(input.clone()), CancellationToken::new()).await;
            assert!(outcome.status.is_ok());
            assert_eq!(outcome.report("copy").unwrap().written, 10_000);
            copies.push(std::fs::read(&path).unwrap());
        }

        assert_eq!(copies[0], input);
        assert_eq!(copies[0], copies[1]);
    }

    /// TOML config -> tee -> files on disk
    #[tokio::test]
    async fn test_toml_config_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("archive.bin");
        let mirror = dir.path().join("mirror/copy.bin");

        let toml = format!(
            r#"
chunk_size = 1024

[[outputs]]
name = "archive"
policy = "lossless"
queue_depth = 8

[outputs.sink]
sink_type = "file"
params = {{ path = "{}" }}

[[outputs]]
name = "mirror"
policy = "detach"
stall_timeout_ms = 500

[outputs.sink]
sink_type = "file"
params = {{ path = "{}", append = "false" }}

[[outputs]]
name = "discard"
policy = "lossy"

[outputs.sink]
sink_type = "null"
"#,
            archive.display(),
            mirror.display()
        );

        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.outputs.len(), 3);

        let input = pattern(50_000);
        let tee = create_tee(&blueprint).await.unwrap();
        let outcome = tee.run(source(input.clone()), CancellationToken::new()).await;

        assert!(outcome.is_success(), "{:?}", outcome.reports);
        assert_eq!(outcome.bytes_read, 50_000);
        assert_eq!(std::fs::read(&archive).unwrap(), input);
        assert_eq!(std::fs::read(&mirror).unwrap(), input);
        assert_eq!(outcome.pool.outstanding(), 0);
    }
}
