//! Shared session walkthrough over the in-memory hub.
//!
//! A host and an early guest join, the host picks the car, a late guest
//! catches up through full sync and then asks for the HoloLens.
//!
//! Run with: cargo run --example shared_session

use scene_sync::{
    Dispatcher, Event, HubTransport, Interaction, LocalHub, ModelKind, ModelSelection, Mounting,
    PeerIdentity, Scene, SceneMirror, Surface, SyncCoordinator, TickInput, Vec3,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Peer = Dispatcher<HubTransport, SceneMirror>;

fn connect(hub: &LocalHub, name: &str) -> Peer {
    let transport = hub.connect();
    let scene = Scene::standard();
    let coordinator = SyncCoordinator::new(
        transport.id(),
        PeerIdentity::new(name, format!("192.168.1.{}", transport.id())),
        &scene,
        Some(transport),
        SceneMirror::new(),
    );
    Dispatcher::new(coordinator, scene)
}

fn pump(hub: &LocalHub, peers: &mut [&mut Peer]) {
    let mut coordinators: Vec<_> = peers.iter_mut().map(|p| p.coordinator_mut()).collect();
    hub.pump(&mut coordinators);
}

fn main() -> Result<(), scene_sync::SyncError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let hub = LocalHub::new();
    let mut host = connect(&hub, "host");
    host.coordinator_mut().start_host()?;

    let mut early = connect(&hub, "early");
    host.coordinator_mut().on_peer_connected(early.coordinator().local_id())?;
    pump(&hub, &mut [&mut host, &mut early]);

    // The host finds a wall and puts the posters on it
    let wall = Surface {
        center: Vec3::new(0.0, 1.5, 3.2),
        normal: Vec3::new(0.0, 0.0, -1.0),
        size: Vec3::new(3.0, 2.0, 0.1),
        thickness: 0.1,
        distance: 3.0,
    };
    host.handle(Event::LocalInteraction(Interaction::SurfacesDetected {
        mounting: Mounting::Wall,
        surfaces: vec![wall; 3],
    }))?;

    host.handle(Event::LocalInteraction(Interaction::PosterClicked {
        model: ModelKind::Car,
    }))?;
    pump(&hub, &mut [&mut host, &mut early]);

    let mut late = connect(&hub, "late");
    host.coordinator_mut().on_peer_connected(late.coordinator().local_id())?;
    pump(&hub, &mut [&mut host, &mut early, &mut late]);
    info!(
        "Late guest shows {:?}",
        late.coordinator().presentation().selection()
    );

    late.handle(Event::LocalInteraction(Interaction::PosterClicked {
        model: ModelKind::HoloLens,
    }))?;
    info!(
        "Late guest before the host answers: {:?}",
        late.coordinator().presentation().selection()
    );
    pump(&hub, &mut [&mut host, &mut early, &mut late]);

    for tick in [&mut host, &mut early, &mut late] {
        tick.handle(Event::Tick(TickInput {
            anchor: Some(true),
            head: Some(Default::default()),
        }))?;
    }
    pump(&hub, &mut [&mut host, &mut early, &mut late]);

    for (name, peer) in [("host", &host), ("early", &early), ("late", &late)] {
        let selection = peer.coordinator().registry().selection();
        info!("{} shows {:?}", name, selection);
        assert_eq!(selection, Some(ModelSelection::HoloLens));
    }
    Ok(())
}
