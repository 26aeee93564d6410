//! Message broker (C8): topic pub/sub and direct-mailbox messaging between strategies.
//!
//! Two delivery modes share one `send_message` call: a channel name that matches a
//! previously-generated mailbox id is delivered to exactly that listener; any other channel
//! name is treated as a topic and fanned out to its subscribers. A topic with no subscribers
//! silently drops the message — there is no dead-letter queue.

use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Receives messages delivered by a [`MessageBroker`]. Implemented by whatever a strategy
/// uses to receive MQ traffic (typically the same Context that owns the strategy).
pub trait MqListener: Send + Sync {
    fn on_message(&self, channel: &str, content: &[u8]);
}

#[derive(Clone)]
struct ListenerHandle(Arc<dyn MqListener>);

impl PartialEq for ListenerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for ListenerHandle {}
impl std::hash::Hash for ListenerHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state)
    }
}

struct Inner {
    topics: HashMap<String, IndexSet<ListenerHandle>>,
    mailboxes: HashMap<String, ListenerHandle>,
    next_mailbox_id: u64,
    listener_mailboxes: HashMap<ListenerHandle, String>,
}

impl Inner {
    fn new() -> Self {
        Self {
            topics: HashMap::new(),
            mailboxes: HashMap::new(),
            next_mailbox_id: 0,
            listener_mailboxes: HashMap::new(),
        }
    }
}

/// Topic subscribe/unsubscribe and direct-mailbox messaging, shared by every strategy in a
/// running system.
pub struct MessageBroker {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for MessageBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MessageBroker")
            .field("topics", &inner.topics.len())
            .field("mailboxes", &inner.mailboxes.len())
            .finish()
    }
}

impl MessageBroker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn MqListener>, channel: impl Into<String>) {
        let handle = ListenerHandle(listener);
        self.inner
            .lock()
            .topics
            .entry(channel.into())
            .or_default()
            .insert(handle);
    }

    pub fn unsubscribe(&self, listener: &Arc<dyn MqListener>, channel: &str) {
        let handle = ListenerHandle(listener.clone());
        let mut inner = self.inner.lock();
        if let Some(subscribers) = inner.topics.get_mut(channel) {
            subscribers.shift_remove(&handle);
            if subscribers.is_empty() {
                inner.topics.remove(channel);
            }
        }
    }

    /// Removes `listener` from every topic it's subscribed to, and erases its generated
    /// mailbox id — a stale handle obtained before this call can no longer be reached via
    /// the generated-id path.
    pub fn unsubscribe_all(&self, listener: &Arc<dyn MqListener>) {
        let handle = ListenerHandle(listener.clone());
        let mut inner = self.inner.lock();
        inner.topics.retain(|_, subscribers| {
            subscribers.shift_remove(&handle);
            !subscribers.is_empty()
        });
        if let Some(mailbox_id) = inner.listener_mailboxes.remove(&handle) {
            inner.mailboxes.remove(&mailbox_id);
        }
    }

    /// Returns `listener`'s mailbox id, generating one on first call. Mailbox ids are never
    /// allocated by `subscribe` — only by a listener's first send.
    fn mailbox_id_for(&self, inner: &mut Inner, listener: &Arc<dyn MqListener>) -> String {
        let handle = ListenerHandle(listener.clone());
        if let Some(id) = inner.listener_mailboxes.get(&handle) {
            return id.clone();
        }
        inner.next_mailbox_id += 1;
        let id = format!("mailbox-{}", inner.next_mailbox_id);
        inner.listener_mailboxes.insert(handle.clone(), id.clone());
        inner.mailboxes.insert(id.clone(), handle);
        id
    }

    /// Ensures `sender` has a mailbox id (generating one if this is its first send), then
    /// delivers `content` on `channel`: directly if `channel` is a mailbox id, else fanned
    /// out to the topic's subscribers.
    pub fn send_message(&self, sender: &Arc<dyn MqListener>, channel: &str, content: &[u8]) {
        let (direct_target, topic_targets) = {
            let mut inner = self.inner.lock();
            self.mailbox_id_for(&mut inner, sender);
            if let Some(target) = inner.mailboxes.get(channel).cloned() {
                (Some(target), Vec::new())
            } else {
                let targets = inner
                    .topics
                    .get(channel)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();
                (None, targets)
            }
        };
        if let Some(target) = direct_target {
            target.0.on_message(channel, content);
        } else {
            for target in &topic_targets {
                target.0.on_message(channel, content);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Recorder {
        received: StdMutex<Vec<(String, Vec<u8>)>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: StdMutex::new(Vec::new()),
            })
        }
    }

    impl MqListener for Recorder {
        fn on_message(&self, channel: &str, content: &[u8]) {
            self.received
                .lock()
                .unwrap()
                .push((channel.to_string(), content.to_vec()));
        }
    }

    #[test]
    fn topic_fanout_reaches_every_subscriber() {
        let broker = MessageBroker::new();
        let a = Recorder::new();
        let b = Recorder::new();
        broker.subscribe(a.clone() as Arc<dyn MqListener>, "prices");
        broker.subscribe(b.clone() as Arc<dyn MqListener>, "prices");
        let sender = Recorder::new();
        broker.send_message(&(sender as Arc<dyn MqListener>), "prices", b"hi");

        assert_eq!(a.received.lock().unwrap().len(), 1);
        assert_eq!(b.received.lock().unwrap().len(), 1);
    }

    #[test]
    fn send_to_unknown_topic_is_silently_dropped() {
        let broker = MessageBroker::new();
        let sender = Recorder::new() as Arc<dyn MqListener>;
        broker.send_message(&sender, "nobody-home", b"hi"); // must not panic
    }

    #[test]
    fn mailbox_id_is_generated_on_first_send_not_on_subscribe() {
        let broker = MessageBroker::new();
        let listener = Recorder::new() as Arc<dyn MqListener>;
        broker.subscribe(listener.clone(), "prices");
        assert!(broker.inner.lock().listener_mailboxes.is_empty());
        broker.send_message(&listener, "prices", b"x");
        assert_eq!(broker.inner.lock().listener_mailboxes.len(), 1);
    }

    #[test]
    fn direct_message_reaches_only_the_mailbox_owner() {
        let broker = MessageBroker::new();
        let a = Recorder::new();
        let b = Recorder::new();
        // `a` sends once to allocate its mailbox id, then we learn it and target `b` with it.
        let a_dyn = a.clone() as Arc<dyn MqListener>;
        broker.send_message(&a_dyn, "unused-topic", b"warmup");
        let mailbox_id = {
            let inner = broker.inner.lock();
            inner.listener_mailboxes.values().next().cloned().unwrap()
        };
        broker.send_message(&(b.clone() as Arc<dyn MqListener>), &mailbox_id, b"direct");

        assert!(b.received.lock().unwrap().is_empty());
        assert_eq!(a.received.lock().unwrap().len(), 1);
        assert_eq!(a.received.lock().unwrap()[0].0, mailbox_id);
    }

    #[test]
    fn unsubscribe_all_erases_mailbox_so_stale_handle_cannot_be_reached() {
        let broker = MessageBroker::new();
        let listener = Recorder::new() as Arc<dyn MqListener>;
        broker.send_message(&listener, "warmup-topic", b"x");
        let mailbox_id = {
            let inner = broker.inner.lock();
            inner.listener_mailboxes.values().next().cloned().unwrap()
        };
        broker.unsubscribe_all(&listener);
        let sender = Recorder::new() as Arc<dyn MqListener>;
        broker.send_message(&sender, &mailbox_id, b"should not arrive"); // silently dropped
        assert!(broker.inner.lock().mailboxes.is_empty());
    }
}
