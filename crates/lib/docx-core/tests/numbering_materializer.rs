mod common;

use std::fs;

use common::{DocxFixture, NUMBERING, W_NS, contains_wml, dir_entries, numbered, paragraph, paragraph_texts};
use docx_core::{
    ControlError,
    MaterializeOptions,
    MissingDefinitionPolicy,
    NumberingMaterializer,
    SeparatorPolicy,
    add_numbering,
};
use docx_package::DocxPackage;

const DOCUMENT: &str = "word/document.xml";

#[test]
fn unnumbered_documents_keep_their_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [paragraph("Alpha"), paragraph(" spaced "), paragraph("Omega")].concat();
    let input = DocxFixture::new(body).with_numbering(NUMBERING).write(dir.path(), "plain.docx");
    let original = fs::read(&input).expect("read input");
    let output = dir.path().join("plain_numbered.docx");

    let report = NumberingMaterializer::default()
        .process(&input, &output)
        .expect("materialize");

    assert_eq!(report.labelled_count, 0);
    assert_eq!(report.paragraph_count, 3);
    let before = DocxPackage::open(&input).expect("open input");
    let after = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&after, DOCUMENT), paragraph_texts(&before, DOCUMENT));
    assert_eq!(fs::read(&input).expect("reread input"), original);
}

#[test]
fn flat_list_is_labelled_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body: String = (1..=5).map(|n| numbered("1", 0, &format!("Item {n}"))).collect();
    let input = DocxFixture::new(body).with_numbering(NUMBERING).write(dir.path(), "flat.docx");
    let output = dir.path().join("flat_numbered.docx");

    assert!(add_numbering(&input, &output));

    let package = DocxPackage::open(&output).expect("open output");
    let expected: Vec<_> = (1..=5).map(|n| format!("{n}. Item {n}")).collect();
    assert_eq!(paragraph_texts(&package, DOCUMENT), expected);
    assert!(!contains_wml(&package, DOCUMENT, "numPr"));
}

#[test]
fn deeper_levels_restart_after_shallower_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [
        numbered("2", 0, "Intro"),
        numbered("2", 1, "First"),
        numbered("2", 1, "Second"),
        numbered("2", 2, "Detail"),
        numbered("2", 0, "Body"),
        numbered("2", 1, "Again"),
        numbered("2", 2, "Deep"),
    ]
    .concat();
    let input = DocxFixture::new(body).with_numbering(NUMBERING).write(dir.path(), "outline.docx");
    let output = dir.path().join("outline_numbered.docx");

    NumberingMaterializer::default()
        .process(&input, &output)
        .expect("materialize");

    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(
        paragraph_texts(&package, DOCUMENT),
        [
            "I. Intro",
            "a) First",
            "b) Second",
            "1.2.1 Detail",
            "II. Body",
            "a) Again",
            "2.1.1 Deep",
        ]
    );
}

#[test]
fn second_pass_is_a_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [numbered("1", 0, "One"), paragraph("Between"), numbered("1", 0, "Two")].concat();
    let input = DocxFixture::new(body).with_numbering(NUMBERING).write(dir.path(), "twice.docx");
    let first = dir.path().join("first.docx");
    let second = dir.path().join("second.docx");

    let materializer = NumberingMaterializer::default();
    materializer.process(&input, &first).expect("first pass");
    let report = materializer.process(&first, &second).expect("second pass");

    assert_eq!(report.labelled_count, 0);
    assert_eq!(report.stripped_count, 0);
    let once = DocxPackage::open(&first).expect("open first");
    let twice = DocxPackage::open(&second).expect("open second");
    assert_eq!(once.part(DOCUMENT), twice.part(DOCUMENT));
}

#[test]
fn missing_definitions_are_skipped_by_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [numbered("7", 0, "Orphan"), numbered("1", 0, "Known")].concat();
    let input = DocxFixture::new(body).with_numbering(NUMBERING).write(dir.path(), "orphan.docx");
    let output = dir.path().join("orphan_numbered.docx");

    let report = NumberingMaterializer::default()
        .process(&input, &output)
        .expect("skip policy succeeds");

    assert_eq!(report.skipped_count, 1);
    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&package, DOCUMENT), ["Orphan", "1. Known"]);
    assert!(!contains_wml(&package, DOCUMENT, "numPr"));
}

#[test]
fn packages_without_numbering_part_skip_list_paragraphs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = [numbered("1", 0, "A"), numbered("2", 1, "B")].concat();
    let input = DocxFixture::new(body).write(dir.path(), "bare_lists.docx");
    let output = dir.path().join("bare_lists_numbered.docx");

    let report = NumberingMaterializer::default()
        .process(&input, &output)
        .expect("skip policy succeeds");

    assert_eq!(report.paragraph_count, 2);
    assert_eq!(report.skipped_count, 2);
    assert_eq!(report.labelled_count, 0);
    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&package, DOCUMENT), ["A", "B"]);
    assert!(!contains_wml(&package, DOCUMENT, "numPr"));

    let again = dir.path().join("bare_lists_again.docx");
    assert!(add_numbering(&output, &again));
}

#[test]
fn strict_mode_fails_without_writing_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = DocxFixture::new(numbered("7", 0, "Orphan")).write(dir.path(), "strict.docx");
    let output = dir.path().join("strict_numbered.docx");

    let options = MaterializeOptions::default().with_missing_definitions(MissingDefinitionPolicy::Fail);
    let err = NumberingMaterializer::new(options)
        .process(&input, &output)
        .expect_err("missing numbering part");

    assert!(matches!(err, ControlError::MissingDefinition(_)));
    assert!(!output.exists());
    assert_eq!(dir_entries(dir.path()), ["strict.docx"]);
}

#[test]
fn tab_separator_inserts_a_tab() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = DocxFixture::new(numbered("1", 0, "Tabbed"))
        .with_numbering(NUMBERING)
        .write(dir.path(), "tab.docx");
    let output = dir.path().join("tab_numbered.docx");

    let options = MaterializeOptions::default().with_separator(SeparatorPolicy::Tab);
    NumberingMaterializer::new(options)
        .process(&input, &output)
        .expect("materialize");

    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&package, DOCUMENT), ["1.\tTabbed"]);
}

#[test]
fn style_numbering_is_materialized_and_removed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let styles = format!(
        r#"<w:styles {W_NS}><w:style w:type="paragraph" w:default="1" w:styleId="Normal"/><w:style w:type="paragraph" w:styleId="Step"><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr></w:pPr></w:style></w:styles>"#
    );
    let step = |text: &str| format!(r#"<w:p><w:pPr><w:pStyle w:val="Step"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#);
    let body = [step("Mix"), paragraph("Wait"), step("Bake")].concat();
    let input = DocxFixture::new(body)
        .with_numbering(NUMBERING)
        .with_styles(styles)
        .write(dir.path(), "styled.docx");
    let output = dir.path().join("styled_numbered.docx");

    let report = NumberingMaterializer::default()
        .process(&input, &output)
        .expect("materialize");

    assert_eq!(report.style_references_stripped, 1);
    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&package, DOCUMENT), ["1. Mix", "Wait", "2. Bake"]);
    assert!(!contains_wml(&package, "word/styles.xml", "numPr"));
}

#[test]
fn header_lists_are_materialized() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = DocxFixture::new(paragraph("Body"))
        .with_numbering(NUMBERING)
        .with_header(numbered("1", 0, "Header item"))
        .write(dir.path(), "header.docx");
    let output = dir.path().join("header_numbered.docx");

    let report = NumberingMaterializer::default()
        .process(&input, &output)
        .expect("materialize");

    assert_eq!(report.parts, ["word/document.xml", "word/header1.xml"]);
    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&package, "word/header1.xml"), ["1. Header item"]);
}

#[test]
fn missing_or_broken_inputs_fail_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.docx");

    assert!(!add_numbering(dir.path().join("missing.docx"), &output));
    assert!(matches!(
        NumberingMaterializer::default().process(dir.path().join("missing.docx"), &output),
        Err(ControlError::InputNotFound(_))
    ));

    let broken = dir.path().join("broken.docx");
    fs::write(&broken, b"not a zip archive").expect("write broken input");
    assert!(matches!(
        NumberingMaterializer::default().process(&broken, &output),
        Err(ControlError::Package(_))
    ));

    let mut bare = DocxPackage::new();
    bare.set_part("word/styles.xml", b"<w:styles/>".to_vec());
    let bare_path = dir.path().join("bare.docx");
    bare.save(&bare_path).expect("save bare package");
    assert!(matches!(
        NumberingMaterializer::default().process(&bare_path, &output),
        Err(ControlError::MalformedPackage(_))
    ));

    assert!(!output.exists());
}

#[test]
fn refuses_to_overwrite_the_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = DocxFixture::new(numbered("1", 0, "Item"))
        .with_numbering(NUMBERING)
        .write(dir.path(), "self.docx");
    let original = fs::read(&input).expect("read input");

    let err = NumberingMaterializer::default()
        .process(&input, &input)
        .expect_err("same path");

    assert!(matches!(err, ControlError::SameInputOutput(_)));
    assert_eq!(fs::read(&input).expect("reread input"), original);
}

#[test]
fn report_serializes_to_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = DocxFixture::new(numbered("1", 0, "Item"))
        .with_numbering(NUMBERING)
        .write(dir.path(), "report.docx");
    let output = dir.path().join("report_numbered.docx");

    let report = NumberingMaterializer::default()
        .process(&input, &output)
        .expect("materialize");
    let json = serde_json::to_value(&report).expect("serialize report");

    assert_eq!(json["labelled_count"], 1);
    assert_eq!(json["parts"][0], "word/document.xml");
}

#[tokio::test]
async fn async_wrapper_matches_blocking_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = DocxFixture::new([numbered("1", 0, "A"), numbered("1", 0, "B")].concat())
        .with_numbering(NUMBERING)
        .write(dir.path(), "async.docx");
    let output = dir.path().join("async_numbered.docx");

    let report = NumberingMaterializer::default()
        .process_async(input, output.clone())
        .await
        .expect("materialize");

    assert_eq!(report.labelled_count, 2);
    let package = DocxPackage::open(&output).expect("open output");
    assert_eq!(paragraph_texts(&package, DOCUMENT), ["1. A", "2. B"]);
}
