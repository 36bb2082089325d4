mod common;

use chrono::{Duration, Utc};

use common::Harness;
use hastypal_bot::database::Repository;
use hastypal_bot::models::TelegramNotification;
use hastypal_bot::reminders::send_due_reminders;

fn notification(id: &str, chat_id: i64, scheduled_in: Duration, sent: bool) -> TelegramNotification {
    let now = Utc::now();
    TelegramNotification {
        id: id.to_string(),
        session_id: format!("session-{}", id),
        booking_id: format!("booking-{}", id),
        business_id: "B1".to_string(),
        scheduled_at: now + scheduled_in,
        chat_id,
        business_name: "Barbería Hastypal".to_string(),
        service_name: "Corte de pelo y barba express".to_string(),
        booking_date: "2024-11-20 10:00".to_string(),
        sent,
        sent_at: None,
        created_at: now,
    }
}

async fn seed(h: &Harness, rows: &[TelegramNotification]) {
    for row in rows {
        h.notifications.inner.save(row).await.unwrap();
    }
}

#[tokio::test]
async fn only_due_unsent_reminders_go_out() {
    let h = Harness::new();
    seed(
        &h,
        &[
            notification("due", 1, Duration::minutes(-5), false),
            notification("later", 2, Duration::hours(3), false),
            notification("done", 3, Duration::hours(-30), true),
        ],
    )
    .await;

    let now = Utc::now();
    let sent = send_due_reminders(&h.state, now).await.unwrap();

    assert_eq!(sent, 1);
    let messages = h.messenger.sent();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].chat_id, 1);
    assert!(messages[0].text.contains("miércoles 20 de noviembre a las 10:00"));

    let stored = h.notifications.all().await;
    let due = stored.iter().find(|n| n.id == "due").unwrap();
    assert!(due.sent);
    assert_eq!(due.sent_at, Some(now));
    assert!(!stored.iter().find(|n| n.id == "later").unwrap().sent);

    // nothing left to send on the next tick
    assert_eq!(send_due_reminders(&h.state, Utc::now()).await.unwrap(), 0);
}

#[tokio::test]
async fn one_failed_delivery_does_not_stop_the_sweep() {
    let h = Harness::new();
    seed(
        &h,
        &[
            notification("blocked", 7, Duration::minutes(-10), false),
            notification("fine", 8, Duration::minutes(-1), false),
        ],
    )
    .await;
    h.messenger.fail_for(7);

    let sent = send_due_reminders(&h.state, Utc::now()).await.unwrap();

    assert_eq!(sent, 1);
    let stored = h.notifications.all().await;
    assert!(!stored.iter().find(|n| n.id == "blocked").unwrap().sent);
    assert!(stored.iter().find(|n| n.id == "fine").unwrap().sent);
}
