//! End-to-end tests for the split/rename and notification pipelines.
//!
//! Payslip PDFs are generated in-process with lopdf: one text block per
//! line so extracted text keeps its line structure, which the renamer's
//! fixed offsets depend on.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use payslip_dispatch::{
    split_and_rename, split_into_pages, Backoff, DispatchError, MailSender,
    NotificationPipeline, OutgoingMessage, RetryPolicy, SqliteUserDirectory, User,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fixture builders ─────────────────────────────────────────────────────

/// Build a PDF with one page per entry; each page renders the given lines
/// as separate text blocks.
fn payslip_pdf(pages: &[Vec<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut page_ids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ));
            operations.push(Operation::new(
                "Td",
                vec![
                    Object::Integer(50),
                    Object::Integer(700 - 16 * i as i64),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(
                    line.as_bytes().to_vec(),
                    lopdf::StringFormat::Literal,
                )],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(pages.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Lines for one well-formed payslip page. Every line is non-empty so the
/// extracted text keeps a stable line count.
fn page_lines<'a>(period: &'a str, name_line: &'a str, id_line: &'a str) -> Vec<&'a str> {
    vec![
        "ACME STATE PAYROLL",
        "PAYSLIP",
        "Period",
        period,
        name_line,
        id_line,
    ]
}

fn write_run(dir: &Path, name: &str, pages: &[Vec<&str>]) -> PathBuf {
    let input = dir.join(name);
    std::fs::write(&input, payslip_pdf(pages)).unwrap();
    input
}

// ── Split flow ───────────────────────────────────────────────────────────

#[tokio::test]
async fn split_produces_one_file_per_page_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let lines = page_lines("JAN-2024", "Name: Doe, John", "IPPIS: 11111");
    let input = write_run(dir.path(), "january-run.pdf", &vec![lines; 5]);

    let pages = split_into_pages(&input).await.unwrap();

    assert_eq!(pages.len(), 5);
    let out_dir = dir.path().join("january-run");
    for i in 0..5 {
        assert_eq!(pages[i], out_dir.join(format!("page{i}.pdf")));
        assert!(pages[i].exists(), "missing page{i}.pdf");
    }

    // Each output is a standalone single-page document.
    let single = Document::load(&pages[2]).unwrap();
    assert_eq!(single.get_pages().len(), 1);
}

#[tokio::test]
async fn split_is_idempotent_over_reruns() {
    let dir = tempfile::tempdir().unwrap();
    let lines = page_lines("JAN-2024", "Name: Doe, John", "IPPIS: 11111");
    let input = write_run(dir.path(), "run.pdf", &vec![lines; 2]);

    split_into_pages(&input).await.unwrap();
    let pages = split_into_pages(&input).await.unwrap();
    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn split_page_text_survives_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_run(
        dir.path(),
        "run.pdf",
        &[page_lines("JAN-2024", "Name: Doe, John", "IPPIS: 11111")],
    );

    let pages = split_into_pages(&input).await.unwrap();
    let doc = payslip_dispatch::PagedDocument::open(&pages[0]).unwrap();
    let text = doc.page_text(0).unwrap();
    assert!(text.contains("IPPIS: 11111"), "got text: {text:?}");
}

#[tokio::test]
async fn split_and_rename_names_pages_from_content() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_run(
        dir.path(),
        "run.pdf",
        &[
            page_lines("JAN-2024", "Name: Doe, John", "IPPIS: 11111"),
            page_lines("FEB-2024", "Name: Okafor, Chinedu", "IPPIS: 22222"),
        ],
    );

    split_and_rename(&input).await.unwrap();

    let out_dir = dir.path().join("run");
    assert!(out_dir.join("11111_Doe_JAN_2024.pdf").exists());
    assert!(out_dir.join("22222_Okafor_FEB_2024.pdf").exists());
    assert!(!out_dir.join("page0.pdf").exists());
    assert!(!out_dir.join("page1.pdf").exists());
}

#[tokio::test]
async fn rename_pass_covers_every_page_of_a_large_run() {
    let dir = tempfile::tempdir().unwrap();
    let id_lines: Vec<String> = (0..8).map(|i| format!("IPPIS: 3000{i}")).collect();
    let pages: Vec<Vec<&str>> = id_lines
        .iter()
        .map(|id| page_lines("MAR-2024", "Name: Bello, Amina", id.as_str()))
        .collect();
    let input = write_run(dir.path(), "run.pdf", &pages);

    split_and_rename(&input).await.unwrap();

    // Every page is renamed exactly once; none is skipped or re-visited
    // even though renaming mutates the directory being processed.
    let out_dir = dir.path().join("run");
    for i in 0..8 {
        assert!(
            out_dir.join(format!("3000{i}_Bello_MAR_2024.pdf")).exists(),
            "page {i} was not renamed"
        );
        assert!(!out_dir.join(format!("page{i}.pdf")).exists());
    }
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 8);
}

#[tokio::test]
async fn malformed_page_keeps_its_name_and_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_run(
        dir.path(),
        "run.pdf",
        &[
            vec!["only", "three", "lines"],
            page_lines("FEB-2024", "Name: Okafor, Chinedu", "IPPIS: 22222"),
        ],
    );

    let err = split_and_rename(&input).await.unwrap_err();
    assert!(matches!(err, DispatchError::MalformedPageText { .. }));

    let out_dir = dir.path().join("run");
    // The malformed page stays put; the well-formed one is still renamed.
    assert!(out_dir.join("page0.pdf").exists());
    assert!(out_dir.join("22222_Okafor_FEB_2024.pdf").exists());
}

// ── Notification flow ────────────────────────────────────────────────────

struct StubMailer {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl StubMailer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MailSender for StubMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[tokio::test]
async fn notify_delivers_matched_file_from_sqlite_directory() {
    let db_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db_dir.path().join("users.db").display());
    let directory = Arc::new(SqliteUserDirectory::connect(&url).await.unwrap());
    directory
        .insert_user(&User {
            id: "u0042".into(),
            staff_id: 12345,
            email: "doe@example.com".into(),
        })
        .await
        .unwrap();

    let folder = tempfile::tempdir().unwrap();
    std::fs::write(folder.path().join("payslip_12345.pdf"), b"%PDF payload").unwrap();
    std::fs::write(folder.path().join("unrelated.pdf"), b"%PDF other").unwrap();

    let mailer = StubMailer::new();
    let pipeline = NotificationPipeline::new(
        directory.clone(),
        mailer.clone(),
        RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO)),
    );

    pipeline.notify(folder.path(), 12345).await.unwrap();
    directory.close().await;

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "doe@example.com");
    assert_eq!(
        sent[0].subject,
        "User ID: 12345 in File: payslip_12345.pdf"
    );
    let att = sent[0].attachment.as_ref().expect("attachment expected");
    assert_eq!(att.filename, "payslip_12345.pdf");
    assert_eq!(att.bytes, b"%PDF payload");
}

#[tokio::test]
async fn notify_with_unregistered_staff_id_sends_nothing() {
    let db_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", db_dir.path().join("users.db").display());
    let directory = Arc::new(SqliteUserDirectory::connect(&url).await.unwrap());

    let folder = tempfile::tempdir().unwrap();
    std::fs::write(folder.path().join("payslip_77777.pdf"), b"%PDF").unwrap();

    let mailer = StubMailer::new();
    let pipeline = NotificationPipeline::new(
        directory.clone(),
        mailer.clone(),
        RetryPolicy::default(),
    );

    pipeline.notify(folder.path(), 77777).await.unwrap();
    directory.close().await;

    assert!(mailer.sent.lock().unwrap().is_empty());
}
