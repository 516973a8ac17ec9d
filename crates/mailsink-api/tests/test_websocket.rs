/// Websocket feed end to end over a real listener
#[path = "common/mod.rs"]
mod common;

use common::test_data::build_simple_email;
use common::{OTHER_TENANT, TENANT, TestApp};
use futures::{SinkExt, StreamExt};
use mailsink_api::ApiContext;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message, client::IntoClientRequest};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(app: &TestApp) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, tenant: Option<&str>) -> Result<Client, tungstenite::Error> {
    let mut request = format!("ws://{}/api/v2/websocket", addr)
        .into_client_request()
        .unwrap();
    if let Some(tenant) = tenant {
        request
            .headers_mut()
            .insert("x-tenant-id", tenant.parse().unwrap());
    }
    tokio_tungstenite::connect_async(request)
        .await
        .map(|(client, _)| client)
}

async fn wait_for_connections(ctx: &Arc<ApiContext>, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while ctx.hub.len().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("hub never reached the expected connection count");
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("no websocket frame")
            .unwrap()
            .unwrap();
        if let Message::Text(_) = frame {
            return frame.to_text().unwrap().to_string();
        }
    }
}

#[tokio::test]
async fn connection_receives_messages_of_its_tenant() {
    let app = TestApp::new();
    let addr = serve(&app).await;

    let mut ours = connect(addr, Some(TENANT)).await.unwrap();
    let mut theirs = connect(addr, Some(OTHER_TENANT)).await.unwrap();
    wait_for_connections(&app.ctx, 2).await;

    let id = app
        .ingest(TENANT, &build_simple_email("a@example.com", "b@example.com", "Live", "hi"))
        .await;

    let payload: serde_json::Value = serde_json::from_str(&next_text(&mut ours).await).unwrap();
    assert_eq!(payload["ID"], id.as_str());
    assert_eq!(payload["From"], "a@example.com");

    let nothing = tokio::time::timeout(Duration::from_millis(200), theirs.next()).await;
    assert!(nothing.is_err(), "other tenant received a frame");
}

#[tokio::test]
async fn closed_connection_is_unregistered() {
    let app = TestApp::new();
    let addr = serve(&app).await;

    let mut client = connect(addr, Some(TENANT)).await.unwrap();
    wait_for_connections(&app.ctx, 1).await;

    client.close(None).await.unwrap();
    wait_for_connections(&app.ctx, 0).await;

    // Broadcasting afterwards is harmless
    app.ingest(TENANT, &build_simple_email("a@example.com", "b@example.com", "x", "y"))
        .await;
    assert!(app.ctx.hub.is_empty().await);
}

#[tokio::test]
async fn handshake_without_tenant_is_rejected() {
    let app = TestApp::new();
    let addr = serve(&app).await;

    match connect(addr, None).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 412);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("handshake should have been rejected"),
    }
    assert!(app.ctx.hub.is_empty().await);
}

#[tokio::test]
async fn shutdown_closes_connections() {
    let app = TestApp::new();
    let addr = serve(&app).await;

    let mut client = connect(addr, Some(TENANT)).await.unwrap();
    wait_for_connections(&app.ctx, 1).await;

    app.ctx.close_subscribers().await;

    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("server did not close the websocket");
    assert!(matches!(frame, Some(Ok(Message::Close(_))) | None));
}
