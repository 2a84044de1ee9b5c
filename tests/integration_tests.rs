//! Integration tests for Paper Meta
//!
//! These tests run the full resolver built from a configuration against a
//! local mock server standing in for the DOI registry, Crossref and arXiv.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use mockito::Matcher;
use paper_meta::config::Config;
use paper_meta::{MetadataResolver, RecordSource, ResolveError, ResolveInput};
use std::path::{Path, PathBuf};

const NATURE_CSL: &str = r#"{
    "type": "article-journal",
    "title": "Human-level control through deep reinforcement learning",
    "author": [
        {"given": "Volodymyr", "family": "Mnih"},
        {"given": "Koray", "family": "Kavukcuoglu"},
        {"given": "David", "family": "Silver"}
    ],
    "issued": {"date-parts": [[2015, 2, 26]]},
    "container-title": "Nature",
    "DOI": "10.1038/nature14539",
    "URL": "https://doi.org/10.1038/nature14539"
}"#;

const ATTENTION_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>arXiv Query: id_list=1706.03762</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>The dominant sequence transduction models are based on complex recurrent networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
</feed>"#;

const ATTENTION_SEARCH: &str = r#"{
    "message": {
        "items": [
            {"DOI": "10.5555/1234567", "title": ["Attention in neural networks"],
             "issued": {"date-parts": [[2016]]}},
            {"DOI": "10.5555/3295222.3295349", "title": ["Attention is All you Need"],
             "author": [{"given": "Ashish", "family": "Vaswani"}],
             "container-title": ["Advances in Neural Information Processing Systems"],
             "issued": {"date-parts": [[2017]]}}
        ]
    }
}"#;

/// A configuration whose every endpoint points at the mock server
fn test_config(server: &mockito::Server) -> Config {
    let mut config = Config::default();
    config.endpoints.doi_base = server.url();
    config.endpoints.crossref_api = server.url();
    config.endpoints.arxiv_api = format!("{}/api/query", server.url());
    config.resolution.polite_delay_ms = 0;
    config.retry.max_attempts = 1;
    config
}

/// Write a one-page PDF with Helvetica text lines `(size, x, y, text)`
fn write_pdf(dir: &Path, name: &str, lines: &[(i64, i64, i64, &str)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for &(size, x, y, text) in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
        operations.push(Operation::new("Td", vec![x.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("save pdf");
    path
}

#[tokio::test]
async fn test_resolve_doi_through_registry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/10.1038/nature14539")
        .with_status(200)
        .with_header("content-type", "application/vnd.citationstyles.csl+json")
        .with_body(NATURE_CSL)
        .create_async()
        .await;

    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();
    let record = resolver
        .resolve(&ResolveInput::doi("https://doi.org/10.1038/nature14539"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        record.title(),
        "Human-level control through deep reinforcement learning"
    );
    assert_eq!(record.authors().len(), 3);
    assert_eq!(record.year(), Some(2015));
    assert_eq!(record.container(), "Nature");
    assert_eq!(record.doi(), "10.1038/nature14539");
    assert_eq!(record.source(), RecordSource::Registry);
    assert_eq!(record.confidence(), 1.0);

    let fields = record.item_fields();
    assert_eq!(fields.item_type, "Article");
    assert_eq!(fields.url, "https://doi.org/10.1038/nature14539");
    assert_eq!(fields.year, "2015");
}

#[tokio::test]
async fn test_resolve_doi_is_repeatable() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/10.1038/nature14539")
        .with_status(200)
        .with_header("content-type", "application/vnd.citationstyles.csl+json")
        .with_body(NATURE_CSL)
        .expect(2)
        .create_async()
        .await;

    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();
    let input = ResolveInput::doi("10.1038/nature14539");
    let first = resolver.resolve(&input).await.unwrap();
    let second = resolver.resolve(&input).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn test_resolve_arxiv_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded(
            "id_list".to_string(),
            "1706.03762".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(ATTENTION_FEED)
        .create_async()
        .await;

    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();
    let record = resolver
        .resolve(&ResolveInput::url("https://arxiv.org/abs/1706.03762"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(record.title(), "Attention Is All You Need");
    assert_eq!(record.authors(), ["Ashish Vaswani", "Noam Shazeer"]);
    assert_eq!(record.year(), Some(2017));
    assert_eq!(record.container(), "arXiv");
    assert_eq!(record.doi(), "");
    assert_eq!(record.source(), RecordSource::Preprint);
    assert_eq!(record.confidence(), 1.0);
}

#[tokio::test]
async fn test_resolve_pdf_by_title_search() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/works")
        .match_query(Matcher::UrlEncoded(
            "query.bibliographic".to_string(),
            "Attention Is All You Need".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ATTENTION_SEARCH)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "attention.pdf",
        &[
            (24, 72, 700, "Attention Is All You Need"),
            (12, 72, 650, "Ashish Vaswani"),
            (10, 72, 600, "Abstract"),
            (10, 72, 580, "The dominant sequence transduction models"),
        ],
    );

    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();

    let hints = resolver.hints(&path).unwrap();
    assert_eq!(hints.title_hint.as_deref(), Some("Attention Is All You Need"));
    assert_eq!(hints.doi, None);

    let record = resolver.resolve(&ResolveInput::pdf(&path)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(record.doi(), "10.5555/3295222.3295349");
    assert_eq!(record.year(), Some(2017));
    assert_eq!(record.source(), RecordSource::TitleSearch);
    assert_eq!(record.confidence(), 1.0);
}

#[tokio::test]
async fn test_resolve_blank_pdf_is_unresolved() {
    let server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "blank.pdf", &[]);

    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();
    let record = resolver.resolve(&ResolveInput::pdf(&path)).await.unwrap();

    assert_eq!(record.confidence(), 0.0);
    assert_eq!(record.title(), "");
    assert_eq!(record.source(), RecordSource::None);
}

#[tokio::test]
async fn test_resolve_errors() {
    let server = mockito::Server::new_async().await;
    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();

    let result = resolver.resolve(&ResolveInput::default()).await;
    assert!(matches!(result, Err(ResolveError::NoInput)));

    let result = resolver
        .resolve(&ResolveInput::pdf("/nonexistent/paper.pdf"))
        .await;
    assert!(matches!(result, Err(ResolveError::Pdf(_))));
}

#[tokio::test]
async fn test_unknown_doi_keeps_caller_identifier() {
    let mut server = mockito::Server::new_async().await;
    let _registry = server
        .mock("GET", "/10.9999/missing")
        .with_status(404)
        .create_async()
        .await;
    let _crossref = server
        .mock("GET", "/works/10.9999/missing")
        .with_status(404)
        .create_async()
        .await;

    let resolver = MetadataResolver::from_config(&test_config(&server)).unwrap();
    let record = resolver
        .resolve(&ResolveInput::doi("10.9999/missing"))
        .await
        .unwrap();

    assert_eq!(record.confidence(), 0.0);
    assert_eq!(record.doi(), "10.9999/missing");
    assert_eq!(record.url(), "https://doi.org/10.9999/missing");
    assert_eq!(record.source(), RecordSource::None);
    assert_eq!(record.item_fields().url, "https://doi.org/10.9999/missing");
    assert!(record.title().is_empty());
}

#[test]
fn test_doi_chain_order_from_config() {
    let resolver = MetadataResolver::from_config(&Config::default()).unwrap();
    let ids: Vec<&str> = resolver.doi_chain().ids().collect();
    assert_eq!(ids, vec!["doi.org", "crossref"]);
}
