use passbook_core::error::EngineError;
use passbook_core::types::FormatKind;

/// Classify an upload from its filename and MIME hint. The extension wins;
/// the MIME hint is only consulted when the extension says nothing. The
/// stream itself is never read.
pub fn detect(filename: Option<&str>, content_type: Option<&str>) -> Result<FormatKind, EngineError> {
    let name = filename.unwrap_or("").to_lowercase();
    if name.ends_with(".csv") {
        return Ok(FormatKind::Csv);
    }
    if name.ends_with(".xlsx") {
        return Ok(FormatKind::Xlsx);
    }
    if name.ends_with(".xls") {
        return Ok(FormatKind::Xls);
    }
    if name.ends_with(".pdf") {
        return Ok(FormatKind::Pdf);
    }

    if let Some(content_type) = content_type {
        let hint = content_type.to_lowercase();
        if hint.contains("csv") {
            return Ok(FormatKind::Csv);
        }
        if hint.contains("excel") || hint.contains("spreadsheetml") {
            return Ok(FormatKind::Xlsx);
        }
        if hint.contains("pdf") {
            return Ok(FormatKind::Pdf);
        }
    }

    Err(EngineError::UnsupportedFormat {
        filename: filename.map(str::to_string),
        content_type: content_type.map(str::to_string),
    })
}
