//! Unit tests for core Tankobon functionality.
//!
//! Tests components through the public API in isolation, without running a
//! full conversion.

use std::sync::Arc;
use tankobon::error::Result;
use tankobon::generator::content::{ContentOptions, render_toc};
use tankobon::generator::needs_blank_after;
use tankobon::partition::{DESCRIPTOR_SIZE, Partitioner, XHTML_PAGE_SIZE};
use tankobon::path_utils::part_output_path;
use tankobon::prelude::*;
use tankobon::progress::{JsonProgress, Progress, ProgressOptions};
use tankobon::report::FailureReport;
use tankobon::tree::{PathTree, collapse_single_root};
use tankobon::viewport::dominant_aspect_ratio;

mod common;
use common::setup_test_dir;

fn page(id: usize, part: u8, dir: &str, ratio: f64) -> Image {
    Image {
        id,
        part,
        path: PathBuf::from(dir),
        name: format!("{:03}.jpg", id),
        width: 600,
        height: 800,
        original_aspect_ratio: ratio,
        ..Default::default()
    }
}

#[test]
fn test_partition_reads_sizes_from_storage() -> Result<()> {
    let dir = setup_test_dir("partition_storage");
    let storage_path = dir.path().join("book.epub.tmp");

    let images: Vec<Image> = (0..4).map(|id| page(id, 0, "ch", 0.75)).collect();
    let mut writer = ImageStorageWriter::create(&storage_path)?;
    for img in &images {
        // incompressible content keeps stored sizes close to the payload
        let payload: Vec<u8> = (0..4096u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        writer.add(&img.epub_img_path(), &payload)?;
    }
    writer.close()?;

    let mut storage = ImageStorageReader::open(&storage_path)?;
    let cover_size = storage.size("OEBPS/Images/img_0_p0.jpeg")?;
    let page_size = storage.size("OEBPS/Images/img_1_p0.jpeg")?;

    // room for exactly two pages per part
    let max = DESCRIPTOR_SIZE + cover_size * 2 + 2 * (page_size + XHTML_PAGE_SIZE) + 1;
    let parts = Partitioner::with_max_size(true, max).partition(images, &mut storage)?;
    let sizes: Vec<usize> = parts.iter().map(|p| p.images.len()).collect();
    assert_eq!(sizes, vec![2, 1]);

    drop(storage);
    assert!(!storage_path.exists());
    Ok(())
}

#[test]
fn test_missing_storage_entry_fails_partition() -> Result<()> {
    let dir = setup_test_dir("partition_missing");
    let storage_path = dir.path().join("book.epub.tmp");
    let mut writer = ImageStorageWriter::create(&storage_path)?;
    writer.add("OEBPS/Images/img_0_p0.jpeg", b"cover")?;
    writer.close()?;

    let mut storage = ImageStorageReader::open(&storage_path)?;
    let images = vec![page(0, 0, "", 0.75), page(1, 0, "", 0.75)];
    assert!(
        Partitioner::new(true, 10)
            .partition(images, &mut storage)
            .is_err()
    );
    Ok(())
}

#[test]
fn test_dominant_ratio_and_normalized_view() -> Result<()> {
    let images = vec![
        page(0, 0, "", 1.5),
        page(1, 0, "", 1.33),
        page(2, 0, "", 1.5),
        page(3, 0, "", 1.5),
    ];
    let parts = Partitioner::new(true, 0).single_part(images)?;
    assert_eq!(dominant_aspect_ratio(&parts), Some(1.5));

    let mut view = View {
        width: 600,
        height: 800,
        ..Default::default()
    };
    view.normalize(&parts);
    assert_eq!((view.width, view.height), (600, 400));

    let mut fixed = View {
        width: 600,
        height: 800,
        aspect_ratio: -1.0,
        ..Default::default()
    };
    fixed.normalize(&parts);
    assert_eq!((fixed.width, fixed.height), (600, 800));
    Ok(())
}

#[test]
fn test_tree_collapse_is_pure() {
    let mut tree = PathTree::new();
    tree.add(Path::new("a/b"), Some("p1.jpg"));
    tree.add(Path::new("a/c"), Some("p2.jpg"));

    let collapsed = collapse_single_root(tree.root());
    let names: Vec<&str> = collapsed.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);
    assert_eq!(tree.root().children.len(), 1);
    assert_eq!(tree.root().children[0].name, "a");
}

#[test]
fn test_toc_follows_part_pages() -> Result<()> {
    let images: Vec<Arc<Image>> = vec![
        Arc::new(page(5, 0, "Series/Chapter 3", 0.75)),
        Arc::new(page(6, 0, "Series/Chapter 4", 0.75)),
    ];
    let toc = render_toc("Book [2/2]", false, true, &images)?;
    assert!(toc.contains(r#"<a href="Text/page_5_p0.xhtml">Chapter 3</a>"#));
    assert!(toc.contains(r#"<a href="Text/page_6_p0.xhtml">Chapter 4</a>"#));
    assert!(!toc.contains("Text/title.xhtml"));
    Ok(())
}

#[test]
fn test_manifest_matches_blank_policy() -> Result<()> {
    let options = ImageOptions {
        keep_double_page_if_split: false,
        ..Default::default()
    };
    let cover = page(0, 0, "", 0.75);
    let images: Vec<Arc<Image>> = vec![
        Arc::new(page(1, 1, "", 0.75)),
        Arc::new(page(1, 2, "", 0.75)),
        Arc::new(page(2, 0, "", 0.75)),
    ];

    let opf = ContentOptions {
        title: "Book",
        has_title_page: false,
        uid: "00000000-0000-0000-0000-000000000000",
        author: "Author",
        publisher: "Tankobon",
        updated_at: "2024-01-01T00:00:00Z",
        image_options: &options,
        view: &options.view,
        cover: &cover,
        images: &images,
        current: 1,
        total: 1,
    }
    .render()?;

    // first split half and last page get a blank, the second half does not
    assert!(needs_blank_after(&images[0], false, &options));
    assert!(!needs_blank_after(&images[1], false, &options));
    assert!(needs_blank_after(&images[2], true, &options));
    assert_eq!(opf.matches(r#"idref="space_1""#).count(), 1);
    assert_eq!(opf.matches(r#"idref="space_2""#).count(), 1);
    assert_eq!(opf.matches(r#"id="space_1""#).count(), 1);
    assert!(opf.contains("<dc:creator>Author</dc:creator>"));
    assert!(opf.contains("urn:uuid:00000000-0000-0000-0000-000000000000"));
    assert!(!opf.contains("calibre:series"));
    Ok(())
}

#[test]
fn test_failure_report_lines() -> Result<()> {
    let mut failed = page(1, 0, "ch1", 0.75);
    failed.error = Some("decode error".into());
    let mut failed_half = page(2, 1, "ch1", 0.75);
    failed_half.error = Some("decode error".into());

    let parts = vec![EpubPart {
        cover: Arc::new(page(0, 0, "ch1", 0.75)),
        images: vec![Arc::new(failed), Arc::new(failed_half)],
    }];
    let report = FailureReport::from_parts(&parts, true);

    let mut out = Vec::new();
    report.write_to(&mut out)?;
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out.lines().filter(|l| !l.is_empty()).count(), 1);
    assert!(out.starts_with("Error on image "));
    Ok(())
}

#[test]
fn test_json_progress_stream() -> Result<()> {
    let mut progress = JsonProgress::new(
        ProgressOptions {
            max: 3,
            description: "Writing Part".to_string(),
            current_job: 2,
            total_job: 2,
            json: true,
            ..Default::default()
        },
        Vec::new(),
    );
    for _ in 0..3 {
        progress.add(1)?;
    }
    progress.close()?;

    let out = String::from_utf8(progress.into_inner()).unwrap();
    let events = out
        .lines()
        .map(serde_json::from_str::<serde_json::Value>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    assert_eq!(events.len(), 3);
    assert_eq!(events[2]["data"]["progress"]["current"], 3);
    assert_eq!(events[2]["data"]["progress"]["total"], 3);
    Ok(())
}

#[test]
fn test_part_output_names() {
    let output = Path::new("out/Book.epub");
    let names: Vec<PathBuf> = (1..=10).map(|i| part_output_path(output, i, 10)).collect();
    assert_eq!(names[0], Path::new("out/Book Part 01 of 10.epub"));
    assert_eq!(names[9], Path::new("out/Book Part 10 of 10.epub"));
}

#[test]
fn test_title_page_policy() {
    assert!(TitlePage::Always.enabled(1));
    assert!(!TitlePage::MultiPartOnly.enabled(1));
    assert!(TitlePage::MultiPartOnly.enabled(2));
    assert!(!TitlePage::Never.enabled(2));
}
