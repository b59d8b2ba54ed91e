//! Room lifecycle, broadcast visibility, and concurrent membership churn

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parley_conversations::rooms::RoomState;
use parley_conversations::{Message, RoomRegistry};

fn message(chat_id: i64, id: i64) -> Message {
    Message {
        id,
        chat_id,
        sender: 1,
        text: format!("message {}", id),
        created_at: Utc::now(),
    }
}

mod test_lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_room_lives_exactly_while_members_attached() {
        let registry = RoomRegistry::new();
        let a = registry.attach(1);
        let b = registry.attach(1);
        assert!(Arc::ptr_eq(&a.room, &b.room));
        assert_eq!(registry.room_count(), 1);

        registry.detach(1, a.connection);
        assert!(registry.room(1).is_some());

        registry.detach(1, b.connection);
        assert!(registry.room(1).is_none());

        tokio::time::timeout(Duration::from_secs(1), async {
            while b.room.state() == RoomState::Running {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_rooms_are_scoped_per_conversation() {
        let registry = RoomRegistry::new();
        let mut first = registry.attach(1);
        let mut second = registry.attach(2);
        assert_eq!(registry.room_count(), 2);

        assert!(registry.publish(message(1, 10)));
        assert_eq!(first.outbox.recv().await.unwrap().id, 10);
        assert!(second.outbox.try_recv().is_err());
    }
}

mod test_broadcast_visibility {
    use super::*;

    #[tokio::test]
    async fn test_members_at_publish_time_see_message() {
        let registry = RoomRegistry::new();
        let mut sender = registry.attach(1);
        let mut stays = registry.attach(1);
        let mut leaves = registry.attach(1);

        registry.detach(1, leaves.connection);
        assert!(sender.room.publish(message(1, 1)));

        assert_eq!(sender.outbox.recv().await.unwrap().id, 1);
        assert_eq!(stays.outbox.recv().await.unwrap().id, 1);
        assert!(leaves.outbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_late_joiner_misses_earlier_messages() {
        let registry = RoomRegistry::new();
        let mut early = registry.attach(1);
        early.room.publish(message(1, 1));
        assert_eq!(early.outbox.recv().await.unwrap().id, 1);

        let mut late = registry.attach(1);
        early.room.publish(message(1, 2));

        assert_eq!(late.outbox.recv().await.unwrap().id, 2);
        assert!(late.outbox.try_recv().is_err());
    }
}

mod test_concurrent_churn {
    use super::*;

    const CONNECTIONS: usize = 32;
    const ROUNDS: usize = 20;
    const MESSAGES: i64 = 200;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_membership_survives_concurrent_attach_detach_publish() {
        let registry = Arc::new(RoomRegistry::new());
        let mut observer = registry.attach(1);

        let churn: Vec<_> = (0..CONNECTIONS)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for _ in 0..ROUNDS {
                        let member = registry.attach(1);
                        assert!(member.room.is_member(member.connection));
                        tokio::task::yield_now().await;
                        registry.detach(1, member.connection);
                        assert!(!member.room.is_member(member.connection));
                    }
                })
            })
            .collect();

        let publisher = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for id in 1..=MESSAGES {
                    assert!(registry.publish(message(1, id)));
                    tokio::task::yield_now().await;
                }
            })
        };

        for task in churn {
            task.await.unwrap();
        }
        publisher.await.unwrap();

        // Only the observer remains; no duplicate or lost entries
        assert_eq!(registry.room_count(), 1);
        assert_eq!(observer.room.member_count(), 1);
        assert!(observer.room.is_member(observer.connection));

        for id in 1..=MESSAGES {
            assert_eq!(observer.outbox.recv().await.unwrap().id, id);
        }

        registry.detach(1, observer.connection);
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_room_churn_without_anchor_member() {
        let registry = Arc::new(RoomRegistry::new());

        let tasks: Vec<_> = (0..CONNECTIONS)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for _ in 0..ROUNDS {
                        let member = registry.attach(7);
                        member.room.publish(message(7, 1));
                        tokio::task::yield_now().await;
                        registry.detach(7, member.connection);
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.room_count(), 0);
        assert!(registry.room(7).is_none());
    }
}
