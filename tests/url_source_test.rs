//! URL file and sitemap loading

mod common;

use common::{create_error_mock, create_xml_mock, test_url};
use kodegen_tools_siteaudit::{AuditError, parse_sitemap, read_url_file};
use mockito::Server;
use tempfile::TempDir;

#[tokio::test]
async fn url_file_skips_comments_blanks_and_invalid_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.txt");
    std::fs::write(
        &path,
        "# staging pages\n\
         https://example.com/\n\
         \n\
         \thttps://example.com/about  \n\
         ftp://example.com/file\n\
         not a url\n\
         http://example.com/contact\n",
    )
    .unwrap();

    let urls = read_url_file(&path).await.unwrap();
    assert_eq!(
        urls,
        vec![
            "https://example.com/",
            "https://example.com/about",
            "http://example.com/contact"
        ]
    );
}

#[tokio::test]
async fn missing_url_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = read_url_file(dir.path().join("nope.txt")).await.unwrap_err();
    assert!(matches!(err, AuditError::Io(_)));
}

#[tokio::test]
async fn urlset_sitemap_lists_pages_in_order() {
    let mut server = Server::new_async().await;
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc></url>
  <url><loc>https://example.com/pricing</loc><priority>0.8</priority></url>
  <url><loc>https://example.com/</loc></url>
</urlset>"#;
    let mock = create_xml_mock(&mut server, "/sitemap.xml", xml);

    let urls = parse_sitemap(&test_url(&server, "/sitemap.xml")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(urls, vec!["https://example.com/", "https://example.com/pricing"]);
}

#[tokio::test]
async fn sitemap_index_is_followed_and_broken_children_skipped() {
    let mut server = Server::new_async().await;
    let index = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{}</loc></sitemap>
  <sitemap><loc>{}</loc></sitemap>
  <sitemap><loc>{}</loc></sitemap>
</sitemapindex>"#,
        test_url(&server, "/pages.xml"),
        test_url(&server, "/broken.xml"),
        test_url(&server, "/posts.xml"),
    );
    let _index = create_xml_mock(&mut server, "/sitemap.xml", &index);
    let _pages = create_xml_mock(
        &mut server,
        "/pages.xml",
        "<urlset><url><loc>https://example.com/a</loc></url></urlset>",
    );
    let _broken = create_error_mock(&mut server, "/broken.xml", 500);
    let _posts = create_xml_mock(
        &mut server,
        "/posts.xml",
        "<urlset><url><loc>https://example.com/b</loc></url>\
         <url><loc>https://example.com/a</loc></url></urlset>",
    );

    let urls = parse_sitemap(&test_url(&server, "/sitemap.xml")).await.unwrap();
    assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
}

#[tokio::test]
async fn failing_root_sitemap_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = create_error_mock(&mut server, "/sitemap.xml", 404);

    let err = parse_sitemap(&test_url(&server, "/sitemap.xml"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::SitemapParse { .. }));
}
