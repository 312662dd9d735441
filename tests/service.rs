use stagelink::config::Config;
use stagelink::exceptions::{ChannelError, LinkError};
use stagelink::host::CardField;
use stagelink::host::memory::MemoryHost;
use stagelink::service::spawn_pipe;
use stagelink::wire::command::Command;
use stagelink::wire::consts::{ActionId, KEY_PAYLOAD};
use stagelink::wire::dict::{self, DictWriter, Value};
use stagelink::wire::types::{ButtonId, MenuIndex};
use stagelink::StagelinkClient;

fn wrap(command: Command<'_>) -> Vec<u8> {
    let packed = command.encode().unwrap();
    let mut w = DictWriter::for_values(&[packed.len()]).unwrap();
    w.bytes(KEY_PAYLOAD, &packed).unwrap();
    w.finish()
}

fn value(message: &[u8], key: u32) -> Value<'_> {
    dict::find(message, key).unwrap().unwrap().value
}

#[tokio::test(start_paused = true)]
async fn first_inbound_message_sets_communicated() {
    let (handle, peer, task) = spawn_pipe(MemoryHost::new(), &Config::default());
    assert!(!handle.has_communicated());

    peer.deliver(wrap(Command::StageClear)).await.unwrap();
    handle.communicated().await.unwrap();
    assert!(handle.has_communicated());

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn selection_request_is_answered() {
    let mut host = MemoryHost::new();
    host.menu.selection = MenuIndex::new(2, 5);
    let (handle, mut peer, task) = spawn_pipe(host, &Config::default());

    peer.deliver(wrap(Command::MenuGetSelection)).await.unwrap();
    let reply = peer.recv().await.unwrap();
    assert_eq!(value(&reply, 0), Value::U8(ActionId::MenuSelection.as_u8()));
    assert_eq!(value(&reply, 1), Value::U16(2));
    assert_eq!(value(&reply, 2), Value::U16(5));
    assert_eq!(handle.queue_len().await, Ok(0));

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn busy_outbox_keeps_click_order() {
    let mut config = Config::default();
    config.channel.event_depth = 1;
    let (handle, mut peer, task) = spawn_pipe(MemoryHost::new(), &config);

    handle.single_click(ButtonId::Up).await.unwrap();
    handle.long_click(ButtonId::Down).await.unwrap();
    handle.window_hide(3).await.unwrap();
    assert_eq!(handle.queue_len().await, Ok(2));

    let mut packed = Vec::new();
    for _ in 0..3 {
        let message = peer.recv().await.unwrap();
        match value(&message, 0) {
            Value::Bytes(bytes) => packed.push(Command::decode(bytes).unwrap().unwrap().id()),
            other => assert_eq!(other, Value::U8(ActionId::WindowHide.as_u8())),
        }
    }
    assert_eq!(
        packed,
        vec![
            stagelink::wire::CommandId::Click,
            stagelink::wire::CommandId::LongClick
        ]
    );
    assert_eq!(handle.queue_len().await, Ok(0));

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn accel_peek_sends_one_sample() {
    let mut host = MemoryHost::new();
    host.accel.sample.z = -1000;
    let (handle, mut peer, task) = spawn_pipe(host, &Config::default());

    peer.deliver(wrap(Command::AccelPeek)).await.unwrap();
    let message = peer.recv().await.unwrap();
    assert_eq!(value(&message, 0), Value::U8(ActionId::AccelData.as_u8()));
    assert_eq!(value(&message, 1), Value::I32(0));
    assert_eq!(value(&message, 2), Value::U8(1));

    handle.shutdown().await;
    let host = task.await.unwrap();
    assert_eq!(host.accel.peeks, 1);
}

#[tokio::test(start_paused = true)]
async fn accel_data_without_transaction_omits_key() {
    let (handle, mut peer, task) = spawn_pipe(MemoryHost::new(), &Config::default());

    handle
        .accel_data(vec![Default::default(); 3], Some(-1))
        .await
        .unwrap();
    let message = peer.recv().await.unwrap();
    assert!(dict::find(&message, 1).unwrap().is_none());
    assert_eq!(value(&message, 2), Value::U8(3));

    handle.shutdown().await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn disconnect_shows_notice_card() {
    let (handle, peer, task) = spawn_pipe(MemoryHost::new(), &Config::default());

    peer.fail(ChannelError::NotConnected).await.unwrap();
    handle.shutdown().await;
    let host = task.await.unwrap();
    assert_eq!(host.card.text(CardField::Subtitle), "Disconnected");
    assert_eq!(host.windows.stack.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stopped_service_rejects_requests() {
    let (handle, _peer, task) = spawn_pipe(MemoryHost::new(), &Config::default());
    handle.shutdown().await;
    task.await.unwrap();
    assert_eq!(handle.window_show(1).await, Err(LinkError::ServiceStopped));
}

#[tokio::test(start_paused = true)]
async fn client_runs_one_service_at_a_time() {
    let client = StagelinkClient::with_config(Config::default());
    let mut peer = client.start(MemoryHost::new()).await.unwrap();
    assert!(matches!(
        client.start(MemoryHost::new()).await,
        Err(LinkError::AlreadyRunning)
    ));

    client.handle().await.unwrap().window_show(4).await.unwrap();
    let message = peer.recv().await.unwrap();
    assert_eq!(value(&message, 0), Value::U8(ActionId::WindowShow.as_u8()));
    assert_eq!(value(&message, 1), Value::U32(4));

    client.stop().await.unwrap();
    assert!(!client.is_running().await);
    assert_eq!(client.handle().await.err(), Some(LinkError::ServiceStopped));
}
