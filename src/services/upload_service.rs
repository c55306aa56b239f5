use std::collections::HashMap;
use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    utils::{now_millis, AppError, AppResult},
};

/// Per-file size limit
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Per text-part size limit
const MAX_TEXT_SIZE: usize = 64 * 1024;

const RESUME_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];
const RESUME_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// File parts accepted by the upload endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Logo,
    Pic,
    Resume,
}

impl UploadKind {
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadKind::Logo => "logo",
            UploadKind::Pic => "pic",
            UploadKind::Resume => "resume",
        }
    }

    /// Directory the file is written to
    pub fn directory(&self, config: &AppConfig) -> PathBuf {
        match self {
            UploadKind::Logo => config.public_dir().join("logos"),
            UploadKind::Pic => config.public_dir().join("pics"),
            UploadKind::Resume => config.resume_dir(),
        }
    }

    /// Path the frontend uses to fetch the file; resumes have none
    pub fn public_path(&self, file_name: &str) -> Option<String> {
        match self {
            UploadKind::Logo => Some(format!("/public/logos/{}", file_name)),
            UploadKind::Pic => Some(format!("/public/pics/{}", file_name)),
            UploadKind::Resume => None,
        }
    }

    pub fn accepts(&self, content_type: Option<&str>, original_name: &str) -> bool {
        match self {
            UploadKind::Logo | UploadKind::Pic => content_type.map_or(false, |ct| ct.starts_with("image/")),
            UploadKind::Resume => {
                let by_extension = extension(original_name)
                    .map_or(false, |ext| RESUME_EXTENSIONS.contains(&ext.as_str()));
                let by_mime = content_type.map_or(false, |ct| RESUME_MIME_TYPES.contains(&ct));
                by_extension || by_mime
            }
        }
    }

    fn rejection(&self) -> AppError {
        match self {
            UploadKind::Logo | UploadKind::Pic => AppError::BadRequest("Only image files are allowed!".to_string()),
            UploadKind::Resume => {
                AppError::BadRequest("Only PDF, DOC or DOCX resumes are allowed!".to_string())
            }
        }
    }
}

/// Lowercased extension of a client supplied file name, if it looks sane
pub fn extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?.to_ascii_lowercase();
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Collision-free stored name: `<millis>-<uuid>[.ext]`
pub fn stored_file_name(original_name: &str) -> String {
    let base = format!("{}-{}", now_millis(), Uuid::new_v4().simple());
    match extension(original_name) {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    }
}

/// Stored names are generated by [`stored_file_name`]; anything else
/// (separators, dot segments) is refused before touching the disk.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

#[derive(Debug, Clone)]
pub struct SavedFile {
    pub kind: UploadKind,
    pub file_name: String,
    pub path: PathBuf,
}

impl SavedFile {
    pub fn public_path(&self) -> Option<String> {
        self.kind.public_path(&self.file_name)
    }
}

/// Parsed multipart body: text parts by name plus the files written to disk
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, Vec<String>>,
    pub files: Vec<SavedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.last()).map(String::as_str)
    }

    pub fn take_file(&mut self, kind: UploadKind) -> Option<SavedFile> {
        let index = self.files.iter().position(|f| f.kind == kind)?;
        Some(self.files.remove(index))
    }

    /// Removes every file of this form from disk
    pub async fn discard(&mut self) {
        for file in self.files.drain(..) {
            remove_file(&file.path).await;
        }
    }
}

/// Best effort delete; a failure is only logged
pub async fn remove_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("⚠️  Could not remove file {}: {}", path.display(), e);
    }
}

async fn read_limited(field: &mut Field, limit: usize, too_large: impl Fn() -> AppError) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if data.len() + chunk.len() > limit {
            return Err(too_large());
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Reads a multipart body. File parts whose name matches one of `accepted`
/// are validated and written to disk; other file parts are ignored. On any
/// error the files already written are removed again.
pub async fn read_multipart(payload: Multipart, accepted: &[UploadKind], config: &AppConfig) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();
    match read_parts(payload, accepted, config, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn read_parts(
    mut payload: Multipart,
    accepted: &[UploadKind],
    config: &AppConfig,
    form: &mut MultipartForm,
) -> AppResult<()> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);

        let Some(original_name) = original_name else {
            let data = read_limited(&mut field, MAX_TEXT_SIZE, || {
                AppError::BadRequest(format!("Field '{}' is too large", name))
            })
            .await?;
            let value = String::from_utf8(data)
                .map_err(|_| AppError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))?;
            form.fields.entry(name).or_default().push(value);
            continue;
        };

        let Some(kind) = accepted.iter().copied().find(|k| k.field_name() == name) else {
            // drain unknown file parts
            while field
                .try_next()
                .await
                .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
                .is_some()
            {}
            continue;
        };

        // Browsers send an empty file part when nothing was picked
        if original_name.is_empty() {
            read_limited(&mut field, MAX_FILE_SIZE, || AppError::BadRequest("File too large".to_string())).await?;
            continue;
        }

        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        if !kind.accepts(content_type.as_deref(), &original_name) {
            return Err(kind.rejection());
        }

        let data = read_limited(&mut field, MAX_FILE_SIZE, || {
            AppError::BadRequest("File too large (max 5 MB)".to_string())
        })
        .await?;

        let directory = kind.directory(config);
        tokio::fs::create_dir_all(&directory).await?;
        let file_name = stored_file_name(&original_name);
        let path = directory.join(&file_name);
        tokio::fs::write(&path, &data).await?;

        log::info!("📁 Stored {} upload: {}", kind.field_name(), file_name);

        // a second part with the same name replaces the first
        if let Some(previous) = form.take_file(kind) {
            remove_file(&previous.path).await;
        }
        form.files.push(SavedFile { kind, file_name, path });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_only_for_logo_and_pic() {
        assert!(UploadKind::Logo.accepts(Some("image/png"), "logo.png"));
        assert!(UploadKind::Pic.accepts(Some("image/jpeg"), "whatever"));
        assert!(!UploadKind::Logo.accepts(Some("application/pdf"), "logo.png"));
        assert!(!UploadKind::Pic.accepts(None, "pic.png"));
    }

    #[test]
    fn test_resume_types() {
        assert!(UploadKind::Resume.accepts(Some("application/pdf"), "cv"));
        assert!(UploadKind::Resume.accepts(Some("application/octet-stream"), "CV.DOCX"));
        assert!(UploadKind::Resume.accepts(None, "cv.doc"));
        assert!(!UploadKind::Resume.accepts(Some("image/png"), "cv.png"));
        assert!(!UploadKind::Resume.accepts(None, "cv.exe"));
    }

    #[test]
    fn test_stored_name_keeps_clean_extension() {
        let name = stored_file_name("My Logo.PNG");
        assert!(name.ends_with(".png"));
        assert!(is_safe_file_name(&name));

        let odd = stored_file_name("../../etc/passwd");
        assert!(!odd.contains('/'));
        assert!(is_safe_file_name(&odd));

        assert_ne!(stored_file_name("a.pdf"), stored_file_name("a.pdf"));
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(extension("cv.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("weird.p$f"), None);
        assert_eq!(extension("long.abcdefghijk"), None);
    }

    #[test]
    fn test_safe_file_names() {
        assert!(is_safe_file_name("1700000000000-abc.pdf"));
        assert!(!is_safe_file_name("../secret"));
        assert!(!is_safe_file_name("a/b.pdf"));
        assert!(!is_safe_file_name(".env"));
        assert!(!is_safe_file_name(""));
    }

    #[test]
    fn test_public_paths() {
        assert_eq!(UploadKind::Logo.public_path("x.png").as_deref(), Some("/public/logos/x.png"));
        assert_eq!(UploadKind::Pic.public_path("y.jpg").as_deref(), Some("/public/pics/y.jpg"));
        assert_eq!(UploadKind::Resume.public_path("z.pdf"), None);
    }

    #[test]
    fn test_form_text_takes_last_value() {
        let mut form = MultipartForm::default();
        form.fields.insert("title".into(), vec!["a".into(), "b".into()]);
        assert_eq!(form.text("title"), Some("b"));
        assert_eq!(form.text("missing"), None);
    }
}
