//! Fan-out of the shared realtime channel to per-conversation and per-user
//! listeners.
//!
//! The channel is opened through the injected [`RealtimeConnector`] when the
//! first [`Subscription`] is taken and closed when the last one is dropped.
//! Without a connector (local-only mode) listeners are registered but never
//! called; callers refresh by polling.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use dormglide_remote::{ChangeEvent, ChannelHandle, EventSink, RealtimeConnector};
use dormglide_shared::{Conversation, Message};

/// Pushed to user listeners when one of their conversations changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationUpdate {
    pub conversation_id: String,
    /// Present for metadata updates.
    pub conversation: Option<Conversation>,
    /// Present when the update was caused by a new message.
    pub message: Option<Message>,
    /// Users concerned. Empty reaches every user listener.
    pub participants: Vec<String>,
}

impl ConversationUpdate {
    pub fn concerns(&self, user_id: &str) -> bool {
        self.participants.is_empty() || self.participants.iter().any(|p| p == user_id)
    }
}

type MessageListener = Arc<dyn Fn(&Message) + Send + Sync>;
type UpdateListener = Arc<dyn Fn(&ConversationUpdate) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ListenerKey {
    Conversation(String, u64),
    User(String, u64),
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    conversations: HashMap<String, Vec<(u64, MessageListener)>>,
    users: HashMap<String, Vec<(u64, UpdateListener)>>,
    subscribers: usize,
    channel: Option<Box<dyn ChannelHandle>>,
}

struct Inner {
    connector: Option<Arc<dyn RealtimeConnector>>,
    registry: Mutex<Registry>,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the listener registries and the shared channel. Clones share state.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    inner: Weak<Inner>,
    key: ListenerKey,
}

impl SubscriptionManager {
    pub fn new(connector: Option<Arc<dyn RealtimeConnector>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// A manager with no push channel.
    pub fn local_only() -> Self {
        Self::new(None)
    }

    pub fn has_push(&self) -> bool {
        self.inner.connector.is_some()
    }

    pub fn is_channel_open(&self) -> bool {
        self.inner.registry().channel.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry().subscribers
    }

    /// Call `callback` for every new message in `conversation_id`.
    pub fn subscribe_to_conversation(
        &self,
        conversation_id: &str,
        callback: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Subscription {
        let key = {
            let mut reg = self.inner.registry();
            reg.next_id += 1;
            let id = reg.next_id;
            reg.conversations
                .entry(conversation_id.to_string())
                .or_default()
                .push((id, Arc::new(callback)));
            reg.subscribers += 1;
            ListenerKey::Conversation(conversation_id.to_string(), id)
        };
        self.ensure_channel();
        self.subscription(key)
    }

    /// Call `callback` whenever a conversation involving `user_id` changes.
    pub fn subscribe_to_user_updates(
        &self,
        user_id: &str,
        callback: impl Fn(&ConversationUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        let key = {
            let mut reg = self.inner.registry();
            reg.next_id += 1;
            let id = reg.next_id;
            reg.users
                .entry(user_id.to_string())
                .or_default()
                .push((id, Arc::new(callback)));
            reg.subscribers += 1;
            ListenerKey::User(user_id.to_string(), id)
        };
        self.ensure_channel();
        self.subscription(key)
    }

    fn subscription(&self, key: ListenerKey) -> Subscription {
        Subscription {
            inner: Arc::downgrade(&self.inner),
            key,
        }
    }

    /// Open the channel if there are subscribers and none is open. The
    /// connector is called without holding the registry lock.
    fn ensure_channel(&self) {
        let Some(connector) = self.inner.connector.clone() else {
            return;
        };
        {
            let reg = self.inner.registry();
            if reg.channel.is_some() || reg.subscribers == 0 {
                return;
            }
        }

        let weak = Arc::downgrade(&self.inner);
        let sink: EventSink = Arc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                dispatch(&inner, event);
            }
        });
        let mut handle = connector.open(sink);

        let mut reg = self.inner.registry();
        if reg.channel.is_none() && reg.subscribers > 0 {
            reg.channel = Some(handle);
        } else {
            // Lost a race with another subscriber or the last unsubscribe.
            drop(reg);
            handle.close();
        }
    }

    /// Deliver an event to the matching listeners.
    pub fn dispatch(&self, event: ChangeEvent) {
        dispatch(&self.inner, event);
    }
}

fn dispatch(inner: &Inner, event: ChangeEvent) {
    match event {
        ChangeEvent::MessageInserted(message) => {
            let listeners: Vec<MessageListener> = inner
                .registry()
                .conversations
                .get(&message.conversation_id)
                .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default();
            for listener in listeners {
                guarded("message", || listener(&message));
            }

            let update = ConversationUpdate {
                conversation_id: message.conversation_id.clone(),
                conversation: None,
                participants: vec![message.sender_id.clone(), message.receiver_id.clone()],
                message: Some(message),
            };
            notify_users(inner, &update);
        }
        ChangeEvent::ConversationUpdated(conversation) => {
            let update = ConversationUpdate {
                conversation_id: conversation.id.clone(),
                participants: conversation.participants(),
                conversation: Some(conversation),
                message: None,
            };
            notify_users(inner, &update);
        }
    }
}

fn notify_users(inner: &Inner, update: &ConversationUpdate) {
    let listeners: Vec<UpdateListener> = inner
        .registry()
        .users
        .iter()
        .filter(|(user_id, _)| update.concerns(user_id))
        .flat_map(|(_, list)| list.iter().map(|(_, l)| l.clone()))
        .collect();
    for listener in listeners {
        guarded("conversation update", || listener(update));
    }
}

/// Run one listener; a panic is logged and does not reach the others.
fn guarded(kind: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(kind, "realtime listener panicked");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let closing = {
            let mut reg = inner.registry();
            let removed = match &self.key {
                ListenerKey::Conversation(conv_id, id) => {
                    remove_listener(&mut reg.conversations, conv_id, *id)
                }
                ListenerKey::User(user_id, id) => remove_listener(&mut reg.users, user_id, *id),
            };
            if removed {
                reg.subscribers = reg.subscribers.saturating_sub(1);
            }
            if reg.subscribers == 0 {
                reg.channel.take()
            } else {
                None
            }
        };
        if let Some(mut channel) = closing {
            channel.close();
            tracing::debug!("last realtime subscriber left, channel closed");
        }
    }
}

fn remove_listener<L>(map: &mut HashMap<String, Vec<(u64, L)>>, key: &str, id: u64) -> bool {
    let Some(list) = map.get_mut(key) else {
        return false;
    };
    let before = list.len();
    list.retain(|(lid, _)| *lid != id);
    let removed = list.len() != before;
    if list.is_empty() {
        map.remove(key);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeConnector {
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
        sink: Mutex<Option<EventSink>>,
    }

    struct FakeHandle {
        closed: Arc<AtomicUsize>,
    }

    impl ChannelHandle for FakeHandle {
        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RealtimeConnector for FakeConnector {
        fn open(&self, sink: EventSink) -> Box<dyn ChannelHandle> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            *self.sink.lock().unwrap() = Some(sink);
            Box::new(FakeHandle {
                closed: self.closed.clone(),
            })
        }
    }

    impl FakeConnector {
        fn push(&self, event: ChangeEvent) {
            let sink = self.sink.lock().unwrap().clone().expect("channel opened");
            sink(event);
        }
    }

    fn message(conversation_id: &str, sender: &str, receiver: &str) -> Message {
        Message {
            id: "m1".into(),
            conversation_id: conversation_id.into(),
            sender_id: sender.into(),
            receiver_id: receiver.into(),
            body: "hello".into(),
            product_id: None,
            created_at: Utc::now(),
        }
    }

    fn setup() -> (Arc<FakeConnector>, SubscriptionManager) {
        let connector = Arc::new(FakeConnector::default());
        let manager = SubscriptionManager::new(Some(connector.clone() as Arc<dyn RealtimeConnector>));
        (connector, manager)
    }

    #[test]
    fn test_channel_is_reference_counted() {
        let (connector, manager) = setup();
        assert!(!manager.is_channel_open());

        let first = manager.subscribe_to_conversation("c1", |_| {});
        let second = manager.subscribe_to_user_updates("u1", |_| {});
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert_eq!(manager.subscriber_count(), 2);

        drop(first);
        assert!(manager.is_channel_open());
        assert_eq!(connector.closed.load(Ordering::SeqCst), 0);

        drop(second);
        assert!(!manager.is_channel_open());
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);

        let _again = manager.subscribe_to_conversation("c1", |_| {});
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_message_reaches_conversation_and_participants() {
        let (connector, manager) = setup();
        let conv_hits = Arc::new(AtomicUsize::new(0));
        let receiver_hits = Arc::new(AtomicUsize::new(0));
        let stranger_hits = Arc::new(AtomicUsize::new(0));

        let hits = conv_hits.clone();
        let _a = manager.subscribe_to_conversation("c1", move |m| {
            assert_eq!(m.body, "hello");
            hits.fetch_add(1, Ordering::SeqCst);
        });
        let hits = receiver_hits.clone();
        let _b = manager.subscribe_to_user_updates("u2", move |update| {
            assert_eq!(update.conversation_id, "c1");
            assert!(update.message.is_some());
            hits.fetch_add(1, Ordering::SeqCst);
        });
        let hits = stranger_hits.clone();
        let _c = manager.subscribe_to_user_updates("u9", move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        let _other_conv = manager.subscribe_to_conversation("c2", |_| panic!("wrong conversation"));

        connector.push(ChangeEvent::MessageInserted(message("c1", "u1", "u2")));

        assert_eq!(conv_hits.load(Ordering::SeqCst), 1);
        assert_eq!(receiver_hits.load(Ordering::SeqCst), 1);
        assert_eq!(stranger_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_conversation_update_filters_by_participant() {
        let (connector, manager) = setup();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = manager.subscribe_to_user_updates("u1", move |update| {
            assert!(update.conversation.is_some());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let conversation = |a: &str, b: &str| Conversation {
            id: "c1".into(),
            product_id: None,
            participant_a: a.into(),
            participant_b: b.into(),
            last_message: Some("hi".into()),
            last_message_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        connector.push(ChangeEvent::ConversationUpdated(conversation("u1", "u2")));
        connector.push(ChangeEvent::ConversationUpdated(conversation("u3", "u4")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_participants_reach_everyone() {
        let update = ConversationUpdate {
            conversation_id: "c1".into(),
            conversation: None,
            message: None,
            participants: vec![],
        };
        assert!(update.concerns("anyone"));
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let (connector, manager) = setup();
        let hits = Arc::new(AtomicUsize::new(0));
        let _bad = manager.subscribe_to_conversation("c1", |_| panic!("listener bug"));
        let counter = hits.clone();
        let _good = manager.subscribe_to_conversation("c1", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        connector.push(ChangeEvent::MessageInserted(message("c1", "u1", "u2")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_listener_stops_receiving() {
        let (connector, manager) = setup();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let sub = manager.subscribe_to_conversation("c1", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _keep_open = manager.subscribe_to_user_updates("u1", |_| {});

        connector.push(ChangeEvent::MessageInserted(message("c1", "u1", "u2")));
        drop(sub);
        connector.push(ChangeEvent::MessageInserted(message("c1", "u1", "u2")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_local_only_registers_without_channel() {
        let manager = SubscriptionManager::local_only();
        let _sub = manager.subscribe_to_conversation("c1", |_| {});
        assert!(!manager.has_push());
        assert!(!manager.is_channel_open());
        assert_eq!(manager.subscriber_count(), 1);
    }
}
