//! Integration tests for the event distribution layer.
//!
//! These drive the poll daemon pass-by-pass with explicit timestamps and
//! observe what a subscribed client actually receives: discovery frames,
//! ordering within a pass, the commit counter event, and the keepalive
//! republish.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use basewatch::events::{EventBus, EventKind, StatusSnapshot, StreamSession};
use basewatch::registry::{Registry, RegistryDaemon};

const RUN_NAME: &str = "160329_M01132_0133_000000000-AMY9J";
const ALL_KINDS: [EventKind; 3] = [EventKind::Counter, EventKind::Run, EventKind::RunSet];

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    state: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("runs");
        let state = tmp.path().join("state");
        fs::create_dir_all(&root).unwrap();
        Self {
            _tmp: tmp,
            root,
            state,
        }
    }

    fn registry(&self) -> Registry {
        Registry::with_paths(vec![self.root.clone()], &self.state, None)
    }

    fn run_dir(&self) -> PathBuf {
        self.root.join(RUN_NAME)
    }

    fn create_run(&self, cycles: u32) {
        let dir = self.run_dir();
        fs::create_dir_all(dir.join("Data/Intensities/BaseCalls/L001")).unwrap();
        fs::write(
            dir.join("RunInfo.xml"),
            format!(
                r#"<RunInfo Version="2"><Run Id="{RUN_NAME}"><Reads>
                   <Read Number="1" NumCycles="{cycles}" IsIndexedRead="N"/>
                   </Reads></Run></RunInfo>"#
            ),
        )
        .unwrap();
        fs::create_dir_all(dir.join("InterOp")).unwrap();
        fs::write(dir.join("InterOp/TileMetricsOut.bin"), tile_metrics()).unwrap();
    }

    fn complete_cycle(&self, cycle: u32) {
        let lane = self.run_dir().join("Data/Intensities/BaseCalls/L001");
        fs::create_dir_all(lane.join(format!("C{}.1", cycle + 1))).unwrap();
    }

    fn finish_run(&self) {
        fs::write(self.run_dir().join("RTAComplete.txt"), b"").unwrap();
    }
}

fn tile_metrics() -> Vec<u8> {
    let mut bytes = vec![2u8, 10u8];
    for tile in 0..4u16 {
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&(1101 + tile).to_le_bytes());
        bytes.extend_from_slice(&103u16.to_le_bytes());
        bytes.extend_from_slice(&250_000.0f32.to_le_bytes());
    }
    bytes
}

#[tokio::test]
async fn discovery_pass_pushes_run_set_then_run_frames() {
    let fixture = Fixture::new();
    fixture.create_run(4);
    let bus = EventBus::new();
    let (mut daemon, _commands) = RegistryDaemon::new(
        fixture.registry(),
        bus.clone(),
        Duration::from_secs(60),
        1_000,
    );

    let (mut session, _handle) =
        StreamSession::open(&bus, &ALL_KINDS, 32, &StatusSnapshot::default());
    // Initial snapshot of an empty registry.
    assert_eq!(session.next_frame().await.unwrap().label, "basecount");
    assert_eq!(session.next_frame().await.unwrap().label, "runs");

    daemon.poll_once(Instant::now());

    let frame = session.next_frame().await.unwrap();
    assert_eq!(frame.label, "runs");
    assert!(frame.data.contains(RUN_NAME));

    let frame = session.next_frame().await.unwrap();
    assert_eq!(frame.label, format!("run.{RUN_NAME}"));
    assert!(frame.data.contains(r#""state":"sequencing""#));
}

#[tokio::test]
async fn commit_pass_publishes_the_counter_after_run_frames() {
    let fixture = Fixture::new();
    fixture.create_run(4);
    let bus = EventBus::new();
    let (mut daemon, _commands) = RegistryDaemon::new(
        fixture.registry(),
        bus.clone(),
        Duration::from_secs(60),
        1_000,
    );

    // Drive the run to finished before any client connects.
    let t0 = Instant::now();
    daemon.poll_once(t0);
    for cycle in 0..4 {
        fixture.complete_cycle(cycle);
        daemon.poll_once(t0 + Duration::from_secs(10 * u64::from(cycle) + 10));
    }
    fixture.finish_run();
    daemon.poll_once(t0 + Duration::from_secs(50));

    let (mut session, _handle) = StreamSession::open(
        &bus,
        &[EventKind::Counter],
        32,
        &StatusSnapshot::default(),
    );
    assert_eq!(
        session.next_frame().await.unwrap().data,
        r#"{"basecount":0}"#
    );

    // The pass after the finish pass commits: 4 cycles * 1M clusters.
    daemon.poll_once(t0 + Duration::from_secs(60));
    assert_eq!(
        session.next_frame().await.unwrap().data,
        r#"{"basecount":4000000}"#
    );
}

#[tokio::test]
async fn keepalive_republishes_the_counter_without_changes() {
    let fixture = Fixture::new();
    let bus = EventBus::new();
    let (mut daemon, _commands) = RegistryDaemon::new(
        fixture.registry(),
        bus.clone(),
        Duration::from_secs(60),
        2,
    );

    let (mut session, _handle) = StreamSession::open(
        &bus,
        &[EventKind::Counter],
        32,
        &StatusSnapshot::default(),
    );
    session.next_frame().await.unwrap();

    let t0 = Instant::now();
    // Two idle polls stay silent; the third exceeds the threshold.
    for i in 0..3 {
        daemon.poll_once(t0 + Duration::from_secs(60 * i));
    }
    let frame = session.next_frame().await.unwrap();
    assert_eq!(frame.label, "basecount");

    // Nothing else is pending.
    let extra = tokio::time::timeout(Duration::from_millis(50), session.next_frame()).await;
    assert!(extra.is_err());
}
