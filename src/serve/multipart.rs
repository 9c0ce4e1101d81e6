//! Minimal multipart/form-data parsing: just enough to pull the uploaded
//! file bytes out of a browser POST.

/// Extracts the boundary token from a `multipart/form-data` Content-Type.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    if !content_type.starts_with("multipart/form-data") {
        return None;
    }
    let marker = "boundary=";
    let start = content_type.find(marker)? + marker.len();
    let rest = &content_type[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    let boundary = rest[..end].trim().trim_matches('"');
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_owned())
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits a multipart body into its parts, each still carrying its headers.
fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = Vec::new();
    let mut rest = body;
    while let Some(pos) = find_subsequence(rest, &delimiter) {
        let (head, tail) = rest.split_at(pos);
        if !head.is_empty() {
            parts.push(head);
        }
        rest = &tail[delimiter.len()..];
        // The closing delimiter is followed by "--".
        if rest.starts_with(b"--") {
            break;
        }
    }
    parts
}

/// Returns the payload of the first part that carries an uploaded file
/// (a `filename=` in its Content-Disposition header).
pub fn extract_file_part(body: &[u8], boundary: &str) -> Option<Vec<u8>> {
    for part in split_parts(body, boundary) {
        let header_end = find_subsequence(part, b"\r\n\r\n")?;
        let headers = String::from_utf8_lossy(&part[..header_end]).to_ascii_lowercase();
        if !headers.contains("filename=") {
            continue;
        }
        let mut payload = &part[header_end + 4..];
        if payload.ends_with(b"\r\n") {
            payload = &payload[..payload.len() - 2];
        }
        return Some(payload.to_vec());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_body(boundary: &str, file_bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\n");
        body.extend_from_slice(b"hello\r\n");
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"face.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(file_bytes);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        body
    }

    #[test]
    fn boundary_is_parsed_from_content_type() {
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=----WebKit123"),
            Some("----WebKit123".to_owned())
        );
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=\"quoted\""),
            Some("quoted".to_owned())
        );
        assert_eq!(extract_boundary("application/json"), None);
        assert_eq!(extract_boundary("multipart/form-data"), None);
    }

    #[test]
    fn file_part_is_extracted_with_binary_payload_intact() {
        let payload = [0u8, 1, 2, 13, 10, 255, 42];
        let body = build_body("xyz", &payload);
        assert_eq!(extract_file_part(&body, "xyz"), Some(payload.to_vec()));
    }

    #[test]
    fn body_without_a_file_field_yields_none() {
        let boundary = "abc";
        let mut body = Vec::new();
        body.extend_from_slice(b"--abc\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n");
        body.extend_from_slice(b"--abc--\r\n");
        assert_eq!(extract_file_part(&body, boundary), None);
    }
}
