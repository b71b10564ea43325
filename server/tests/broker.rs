use std::time::Duration;

use canvas_server::connection::{ConnectionEvent, CONNECTION_BUFFER};
use canvas_server::server::{spawn_server, ServerCommand, ServerTx};
use system::chrono::{self, Utc};
use system::{
    ClientStroke, ColorConfig, ConnectionId, Position, ServerMessage, Stroke, StrokeSettings,
};
use tokio::sync::mpsc::{channel, Receiver};
use tokio::time::timeout;

struct Client {
    connection_id: ConnectionId,
    color: ColorConfig,
    rx: Receiver<ConnectionEvent>,
}

impl Client {
    async fn connect(srv_tx: &ServerTx) -> Self {
        let (tx, mut rx) = channel(CONNECTION_BUFFER);
        srv_tx.send(ServerCommand::Connect { tx }).await.expect("");

        let connection_id = match recv(&mut rx).await {
            Some(ConnectionEvent::Connected { connection_id }) => connection_id,
            other => panic!("expected Connected, got {:?}", other),
        };
        let color = match next_message(&mut rx).await {
            ServerMessage::Config(color) => color,
            other => panic!("expected config, got {:?}", other),
        };

        Self {
            connection_id,
            color,
            rx,
        }
    }

    async fn next(&mut self) -> ServerMessage {
        next_message(&mut self.rx).await
    }

    async fn assert_silent(&mut self) {
        assert!(
            timeout(Duration::from_millis(50), self.rx.recv()).await.is_err(),
            "expected no message"
        );
    }

    async fn draw(&self, srv_tx: &ServerTx, positions: Vec<Position>) {
        let stroke = ClientStroke {
            color: Some("#ff00ff".into()),
            positions,
        };
        srv_tx
            .send(ServerCommand::Stroke {
                from: self.connection_id,
                stroke,
            })
            .await
            .expect("");
    }
}

async fn recv(rx: &mut Receiver<ConnectionEvent>) -> Option<ConnectionEvent> {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
}

async fn next_message(rx: &mut Receiver<ConnectionEvent>) -> ServerMessage {
    match recv(rx).await {
        Some(ConnectionEvent::Message(message)) => (*message).clone(),
        other => panic!("expected message, got {:?}", other),
    }
}

fn line(x: f64) -> Vec<Position> {
    vec![Position::new(x, 0.0), Position::new(x, 10.0)]
}

fn xs(strokes: &[Stroke]) -> Vec<f64> {
    strokes.iter().map(|s| s.positions()[0].x).collect()
}

#[tokio::test]
async fn it_greets_new_connection_with_config_and_snapshot() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;

    assert!(alice.color.color.starts_with('#'));
    assert_eq!(alice.next().await, ServerMessage::Init(Vec::new()));
}

#[tokio::test]
async fn it_publishes_init_to_everyone_when_someone_joins() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;

    alice.draw(&srv_tx, line(1.0)).await;
    match alice.next().await {
        ServerMessage::Add(strokes) => assert_eq!(xs(&strokes), vec![1.0]),
        other => panic!("unexpected {:?}", other),
    }

    let mut bob = Client::connect(&srv_tx).await;
    assert_ne!(alice.connection_id, bob.connection_id);

    for client in [&mut alice, &mut bob].iter_mut() {
        match client.next().await {
            ServerMessage::Init(strokes) => assert_eq!(xs(&strokes), vec![1.0]),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[tokio::test]
async fn it_stores_simplified_stroke_under_assigned_color() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;

    alice
        .draw(
            &srv_tx,
            vec![
                Position::new(0.0, 0.0),
                Position::new(5.0, 1.0),
                Position::new(10.0, 0.0),
            ],
        )
        .await;

    match alice.next().await {
        ServerMessage::Add(strokes) => {
            assert_eq!(strokes.len(), 1);
            assert_eq!(strokes[0].color(), alice.color.color);
            assert_eq!(
                strokes[0].positions(),
                &[Position::new(0.0, 0.0), Position::new(10.0, 0.0)][..]
            );
            assert!(strokes[0].expires_at() > Utc::now() + chrono::Duration::minutes(239));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn it_drops_empty_stroke_without_broadcast() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;

    alice.draw(&srv_tx, Vec::new()).await;
    alice.assert_silent().await;

    alice.draw(&srv_tx, line(2.0)).await;
    match alice.next().await {
        ServerMessage::Add(strokes) => assert_eq!(xs(&strokes), vec![2.0]),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn every_subscriber_sees_strokes_in_append_order() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;
    let mut bob = Client::connect(&srv_tx).await;
    alice.next().await;
    bob.next().await;

    alice.draw(&srv_tx, line(1.0)).await;
    bob.draw(&srv_tx, line(2.0)).await;
    alice.draw(&srv_tx, line(3.0)).await;

    for client in [&mut alice, &mut bob].iter_mut() {
        let mut seen = Vec::new();
        for _ in 0..3 {
            match client.next().await {
                ServerMessage::Add(strokes) => seen.push(xs(&strokes)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(seen, vec![vec![1.0], vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);
    }
}

#[tokio::test]
async fn disconnect_unsubscribes_only_that_session() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;
    let mut bob = Client::connect(&srv_tx).await;
    alice.next().await;
    bob.next().await;

    srv_tx
        .send(ServerCommand::Disconnect {
            from: bob.connection_id,
        })
        .await
        .expect("");
    assert!(recv(&mut bob.rx).await.is_none());

    bob.draw(&srv_tx, line(9.0)).await;
    alice.draw(&srv_tx, line(1.0)).await;
    match alice.next().await {
        ServerMessage::Add(strokes) => assert_eq!(xs(&strokes), vec![1.0]),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn vanished_connection_does_not_disturb_others() {
    let srv_tx = spawn_server(StrokeSettings::default());
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;
    let bob = Client::connect(&srv_tx).await;
    alice.next().await;
    drop(bob);

    alice.draw(&srv_tx, line(1.0)).await;
    alice.draw(&srv_tx, line(2.0)).await;
    alice.next().await;
    match alice.next().await {
        ServerMessage::Add(strokes) => assert_eq!(xs(&strokes), vec![1.0, 2.0]),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn sweep_publishes_surviving_strokes_only_when_something_expired() {
    let settings = StrokeSettings {
        ttl: chrono::Duration::hours(1),
        ..StrokeSettings::default()
    };
    let srv_tx = spawn_server(settings);
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;

    alice.draw(&srv_tx, line(1.0)).await;
    alice.next().await;

    srv_tx
        .send(ServerCommand::Sweep { now: Utc::now() })
        .await
        .expect("");
    alice.assert_silent().await;

    srv_tx
        .send(ServerCommand::Sweep {
            now: Utc::now() + chrono::Duration::hours(2),
        })
        .await
        .expect("");
    assert_eq!(alice.next().await, ServerMessage::Init(Vec::new()));

    let mut bob = Client::connect(&srv_tx).await;
    assert_eq!(bob.next().await, ServerMessage::Init(Vec::new()));
}

#[tokio::test]
async fn late_joiner_never_receives_expired_strokes_before_a_sweep() {
    let settings = StrokeSettings {
        ttl: chrono::Duration::milliseconds(50),
        ..StrokeSettings::default()
    };
    let srv_tx = spawn_server(settings);
    let mut alice = Client::connect(&srv_tx).await;
    alice.next().await;

    alice.draw(&srv_tx, line(1.0)).await;
    match alice.next().await {
        ServerMessage::Add(strokes) => assert_eq!(xs(&strokes), vec![1.0]),
        other => panic!("unexpected {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut bob = Client::connect(&srv_tx).await;
    assert_eq!(bob.next().await, ServerMessage::Init(Vec::new()));
    assert_eq!(alice.next().await, ServerMessage::Init(Vec::new()));

    alice.draw(&srv_tx, line(2.0)).await;
    match bob.next().await {
        ServerMessage::Add(strokes) => assert_eq!(xs(&strokes), vec![2.0]),
        other => panic!("unexpected {:?}", other),
    }
}
