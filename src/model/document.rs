//! 文档生成：把识别结果按顺序写成一个 DOCX 文件

use crate::model::ocr::ExtractionResult;
use crate::util::logging::standards::events;
use crate::util::naming;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// 正文字号（半磅，24 即 12pt）
const BODY_FONT_HALF_POINTS: usize = 24;

/// 下载路由前缀
pub const DOWNLOAD_ROUTE: &str = "/downloads";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("failed to render DOCX: {0}")]
    Render(String),

    #[error("failed to write DOCX: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOCX rendering task aborted: {0}")]
    Join(String),
}

/// 已写入下载目录的文档
#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub file_name: String,
    pub path: PathBuf,
    pub paragraph_count: usize,
    pub size: u64,
}

impl OutputDocument {
    /// 下载地址（相对路径）
    pub fn url(&self) -> String {
        format!("{}/{}", DOWNLOAD_ROUTE, self.file_name)
    }
}

/// 一段识别文本对应一个段落
///
/// 换行写成段内换行符，制表符写成制表位，文字本身不做其他处理。
fn text_paragraph(text: &str) -> Paragraph {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut run = Run::new().size(BODY_FONT_HALF_POINTS);

    for (line_no, line) in normalized.split('\n').enumerate() {
        if line_no > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (segment_no, segment) in line.split('\t').enumerate() {
            if segment_no > 0 {
                run = run.add_tab();
            }
            if !segment.is_empty() {
                run = run.add_text(segment);
            }
        }
    }

    Paragraph::new().add_run(run)
}

pub fn render_docx(texts: &[String]) -> Result<Vec<u8>, AssemblyError> {
    let docx = texts
        .iter()
        .fold(Docx::new(), |docx, text| docx.add_paragraph(text_paragraph(text)));

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| AssemblyError::Render(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// 文档生成器
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    download_dir: PathBuf,
}

impl DocumentAssembler {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub async fn assemble(
        &self,
        mut results: Vec<ExtractionResult>,
    ) -> Result<OutputDocument, AssemblyError> {
        results.sort_by_key(|r| r.index);
        let texts: Vec<String> = results.into_iter().map(|r| r.text).collect();
        let paragraph_count = texts.len();

        let bytes = tokio::task::spawn_blocking(move || render_docx(&texts))
            .await
            .map_err(|e| AssemblyError::Join(e.to_string()))?
            .inspect_err(|e| error!(event = events::DOCUMENT_FAILED, error = %e))?;

        let file_name = naming::output_file_name();
        let path = self.download_dir.join(&file_name);
        let written = write_document(&self.download_dir, &path, &bytes).await;
        if let Err(e) = &written {
            error!(
                event = events::DOCUMENT_FAILED,
                path = %path.display(),
                error = %e
            );
        }
        written?;

        info!(
            event = events::DOCUMENT_WRITTEN,
            file_name = %file_name,
            paragraphs = paragraph_count,
            size = bytes.len()
        );

        Ok(OutputDocument {
            file_name,
            path,
            paragraph_count,
            size: bytes.len() as u64,
        })
    }
}

async fn write_document(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Read;
    use std::path::Path;

    /// 读取 DOCX 中的 `word/document.xml`
    pub fn document_xml(path: &Path) -> String {
        xml_from_bytes(&std::fs::read(path).unwrap())
    }

    pub fn xml_from_bytes(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("word/document.xml").unwrap();
        let mut xml = String::new();
        entry.read_to_string(&mut xml).unwrap();
        xml
    }

    pub fn paragraph_count(xml: &str) -> usize {
        xml.matches("<w:p>").count() + xml.matches("<w:p ").count()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{document_xml, paragraph_count, xml_from_bytes};
    use super::*;
    use tempfile::TempDir;

    fn result(index: usize, text: &str) -> ExtractionResult {
        ExtractionResult {
            index,
            source_name: format!("page-{index}.png"),
            text: text.to_string(),
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_paragraph_per_text() {
        let texts = texts(&["alpha", "beta", "gamma"]);
        let xml = xml_from_bytes(&render_docx(&texts).unwrap());
        assert_eq!(paragraph_count(&xml), texts.len());
        assert!(xml.contains("alpha") && xml.contains("gamma"));
    }

    #[test]
    fn single_empty_text_is_still_one_paragraph() {
        let xml = xml_from_bytes(&render_docx(&texts(&[""])).unwrap());
        assert_eq!(paragraph_count(&xml), 1);
    }

    #[test]
    fn line_breaks_inside_a_text_are_kept() {
        let xml = xml_from_bytes(&render_docx(&texts(&["line one\nline two", ""])).unwrap());

        assert_eq!(paragraph_count(&xml), 2);
        assert!(!xml.contains("line oneline two"));
        let first = xml.find("line one").unwrap();
        let brk = xml.find("<w:br").unwrap();
        let second = xml.find("line two").unwrap();
        assert!(first < brk && brk < second);
    }

    #[test]
    fn crlf_and_tabs_are_not_glued_together() {
        let xml = xml_from_bytes(&render_docx(&texts(&["tab\there\r\nwin"])).unwrap());

        assert_eq!(paragraph_count(&xml), 1);
        assert!(!xml.contains("herewin"));
        assert!(xml.contains("<w:tab"));
        assert!(xml.contains("<w:br"));
        assert!(xml.contains("win"));
    }

    #[test]
    fn markup_characters_are_escaped() {
        let xml = xml_from_bytes(&render_docx(&texts(&["a < b & c"])).unwrap());
        assert!(xml.contains("a &lt; b &amp; c"));
    }

    #[tokio::test]
    async fn paragraphs_follow_index_order() {
        let dir = TempDir::new().unwrap();
        let assembler = DocumentAssembler::new(dir.path().join("downloads"));

        let doc = assembler
            .assemble(vec![
                result(2, "ThirdPage"),
                result(0, "FirstPage"),
                result(1, "SecondPage"),
            ])
            .await
            .unwrap();

        assert!(doc.path.exists());
        assert!(naming::is_output_file_name(&doc.file_name));
        assert_eq!(doc.url(), format!("/downloads/{}", doc.file_name));
        assert_eq!(doc.paragraph_count, 3);

        let xml = document_xml(&doc.path);
        let first = xml.find("FirstPage").unwrap();
        let second = xml.find("SecondPage").unwrap();
        let third = xml.find("ThirdPage").unwrap();
        assert!(first < second && second < third);
        assert_eq!(paragraph_count(&xml), 3);
    }

    #[tokio::test]
    async fn each_assembly_writes_a_new_file() {
        let dir = TempDir::new().unwrap();
        let assembler = DocumentAssembler::new(dir.path());

        let a = assembler.assemble(vec![result(0, "one")]).await.unwrap();
        let b = assembler.assemble(vec![result(0, "one")]).await.unwrap();

        assert_ne!(a.file_name, b.file_name);
        assert!(a.path.exists() && b.path.exists());
    }
}
