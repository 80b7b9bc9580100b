use axum::{
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use fake::{
    faker::{company::en::CatchPhrase, internet::en::SafeEmail},
    Fake,
};
use std::{path::PathBuf, sync::Arc};

use crate::{
    classifier::LanguageModels,
    config::Config,
    detector::UnsubscribeDetector,
    instruction::UnsubscribeInstruction,
    runner::{RunSummary, Unsubscriber},
    test_support::{serve, RecordingTransport},
    transport::{ListFilter, LocalMailbox, MailTransport},
    types::{MessagePayload, PayloadBody, PayloadPart, RawMessage},
    Message,
};

fn samples() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("samples/mailbox")
}

fn config() -> Config {
    Config::default().without_delay()
}

async fn sample_message(mailbox: &LocalMailbox, id: &str) -> Message {
    Message::from_raw(mailbox.get_message(id).await.unwrap()).unwrap()
}

#[tokio::test]
async fn every_sample_is_detected_by_the_expected_strategy() {
    let mailbox = LocalMailbox::new(samples(), "me@home.example");
    let detector = UnsubscribeDetector::new(Arc::new(LanguageModels::offline()), &config()).unwrap();

    let expected = [
        (
            "01-list-header.eml",
            Some(UnsubscribeInstruction::MailTo {
                address: "leave@lists.example.com".to_owned(),
                subject: Some("unsubscribe digest".to_owned()),
                body: None,
            }),
        ),
        (
            "02-html-anchor.eml",
            Some(UnsubscribeInstruction::Link(
                "https://brand.example.com/manage?id=3".to_owned(),
            )),
        ),
        (
            "03-plain-sentence.email",
            Some(UnsubscribeInstruction::Link(
                "https://garden.example.com/leave/9".to_owned(),
            )),
        ),
        (
            "04-russian.eml",
            Some(UnsubscribeInstruction::Link(
                "https://shop.example.ru/unsub/5".to_owned(),
            )),
        ),
        ("05-order.eml", None),
        (
            "Spam/06-payload.json",
            Some(UnsubscribeInstruction::Link(
                "https://promo.example.com/stop/2".to_owned(),
            )),
        ),
    ];

    for (id, instruction) in expected {
        let message = sample_message(&mailbox, id).await;
        assert_eq!(detector.detect(&message).await, instruction, "sample {id}");
    }
}

#[tokio::test]
async fn dry_run_over_the_samples_only_detects() {
    let mailbox = Arc::new(LocalMailbox::new(samples(), "me@home.example"));
    let unsubscriber = Unsubscriber::new(mailbox, Arc::new(LanguageModels::offline()), &config())
        .unwrap()
        .dry_run(true);

    let summary = unsubscriber.run(&ListFilter::default()).await.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            scanned: 6,
            skipped: 0,
            detected: 5,
            unsubscribed: 0,
            failed: 0,
        }
    );

    let inbox_only = unsubscriber
        .run(&ListFilter {
            max_results: 500,
            include_spam_trash: false,
        })
        .await
        .unwrap();
    assert_eq!(inbox_only.scanned, 5);
    assert_eq!(inbox_only.detected, 4);
}

fn rfc822(from: &str, headers: &str, content_type: &str, body: &str) -> String {
    let subject: String = CatchPhrase().fake();

    format!(
        "From: {from}\r\nTo: me@home.example\r\nSubject: {subject}\r\n{headers}Content-Type: {content_type}; charset=utf-8\r\n\r\n{body}\r\n"
    )
}

#[tokio::test]
async fn full_run_acts_on_every_offer() {
    let app = Router::new()
        .route(
            "/list/1",
            get(|| async {
                Html(
                    r#"<p>Leave the list?</p>
                    <form method="post" action="/list/1/confirm">
                        <input type="email" name="email">
                        <input type="submit" value="Confirm">
                    </form>"#,
                )
            }),
        )
        .route(
            "/list/1/confirm",
            post(|body: String| async move {
                if body.contains("email=me%40home.example") {
                    Html("<p>You have been unsubscribed.</p>")
                } else {
                    Html("<p>Unknown address</p>")
                }
            }),
        )
        .route(
            "/gone",
            get(|| async { (StatusCode::GONE, Html("<p>This list no longer exists</p>")) }),
        );
    let base = serve(app).await;

    let sender: String = SafeEmail().fake();
    let mut transport = RecordingTransport::new("me@home.example")
        .with_message(
            "form",
            &rfc822(
                &sender,
                &format!("List-Unsubscribe: <{base}/list/1>\r\n"),
                "text/plain",
                "Thanks for reading.",
            ),
        )
        .with_message(
            "mailto",
            &rfc822(
                &sender,
                "List-Unsubscribe: <mailto:stop@lists.example.com?subject=stop&body=please%20stop>\r\n",
                "text/plain",
                "Thanks for reading.",
            ),
        )
        .with_message(
            "gone",
            &rfc822(
                &sender,
                "",
                "text/html",
                &format!(r#"<p>See you soon. <a href="{base}/gone">unsubscribe</a></p>"#),
            ),
        )
        .with_message(
            "order",
            &rfc822(
                &sender,
                "",
                "text/plain",
                "Your order has shipped and is on its way to you.",
            ),
        );
    transport.messages.push((
        "corrupt".to_owned(),
        RawMessage::Payload(MessagePayload {
            id: None,
            payload: PayloadPart {
                body: Some(PayloadBody {
                    data: Some("!!! not base64 !!!".to_owned()),
                    size: None,
                }),
                ..Default::default()
            },
        }),
    ));
    let transport = Arc::new(transport);

    let unsubscriber =
        Unsubscriber::new(transport.clone(), Arc::new(LanguageModels::offline()), &config()).unwrap();
    let summary = unsubscriber.run(&ListFilter::default()).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            scanned: 5,
            skipped: 1,
            detected: 3,
            unsubscribed: 2,
            failed: 1,
        }
    );

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, "me@home.example");
    assert_eq!(sent[0].to, "stop@lists.example.com");
    assert_eq!(sent[0].subject, "stop");
    assert_eq!(sent[0].body, "please stop");
}

#[tokio::test]
async fn max_results_limits_the_scan() {
    let transport = Arc::new(
        RecordingTransport::new("me@home.example")
            .with_message("a", &rfc822("a@shop.example", "", "text/plain", "Hi."))
            .with_message("b", &rfc822("b@shop.example", "", "text/plain", "Hi.")),
    );
    let unsubscriber = Unsubscriber::new(transport, Arc::new(LanguageModels::offline()), &config())
        .unwrap();

    let summary = unsubscriber
        .run(&ListFilter {
            max_results: 1,
            include_spam_trash: true,
        })
        .await
        .unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.detected, 0);
}

#[tokio::test]
async fn header_mailto_is_detected_and_mailed_once() {
    let raw = rfc822(
        "News <news@list.com>",
        "List-Unsubscribe: <mailto:out@list.com?subject=unsub>\r\n",
        "text/plain",
        "Weekly news.",
    );
    let transport = Arc::new(RecordingTransport::new("me@home.example").with_message("1", &raw));
    let unsubscriber =
        Unsubscriber::new(transport.clone(), Arc::new(LanguageModels::offline()), &config()).unwrap();

    let summary = unsubscriber.run(&ListFilter::default()).await.unwrap();

    assert_eq!(summary.unsubscribed, 1);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "out@list.com");
    assert_eq!(sent[0].subject, "unsub");
    assert_eq!(sent[0].body, crate::actor::DEFAULT_BODY);
}
