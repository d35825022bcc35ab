use core::fmt;

use url::Url;

const SEP: char = '/';

pub const UPLOAD_PATH: &str = "upload";
pub const FILES_PATH: &str = "files";

/// API base URL, possibly with a path prefix (e.g. a gateway stage).
#[derive(Clone)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    #[must_use]
    pub fn new(uri: &str) -> Option<Endpoint> {
        let base = Url::parse(uri).ok()?;
        if base.cannot_be_a_base() {
            return None;
        }
        Some(Endpoint { url: base })
    }

    #[must_use]
    pub fn upload(&self) -> Url {
        self.join(UPLOAD_PATH)
    }

    #[must_use]
    pub fn files(&self) -> Url {
        self.join(FILES_PATH)
    }

    /// Appends `path` segments to the base path keeping a single separator between them.
    fn join(&self, path: &str) -> Url {
        let segments: Vec<&str> = self
            .url
            .path()
            .split(SEP)
            .chain(path.split(SEP))
            .filter(|x| !x.is_empty())
            .collect();
        let mut url = self.url.clone();
        url.set_path(&segments.join("/"));
        url.set_query(None);
        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn new_correct_some() {
        // Arrange

        // Act
        let r = Endpoint::new("http://localhost");

        // Assert
        assert!(r.is_some());
    }

    #[test_case("http/localhost" ; "no scheme")]
    #[test_case("mailto:someone@example.com" ; "not a base")]
    #[test_case("" ; "empty")]
    fn new_incorrect_none(uri: &str) {
        // Act
        let r = Endpoint::new(uri);

        // Assert
        assert!(r.is_none());
    }

    #[test_case("http://localhost", "http://localhost/upload" ; "bare host")]
    #[test_case("http://localhost/", "http://localhost/upload" ; "slashed host")]
    #[test_case("http://localhost:5000", "http://localhost:5000/upload" ; "port")]
    #[test_case("https://api.example.com/dev", "https://api.example.com/dev/upload" ; "stage")]
    #[test_case("https://api.example.com/dev/", "https://api.example.com/dev/upload" ; "slashed stage")]
    #[test_case("https://api.example.com/a//b", "https://api.example.com/a/b/upload" ; "double slash")]
    #[test_case("http://localhost/?x=1", "http://localhost/upload" ; "query dropped")]
    fn upload_url(base: &str, expected: &str) {
        // Arrange
        let e = Endpoint::new(base).unwrap();

        // Act
        let url = e.upload();

        // Assert
        assert_eq!(url.as_str(), expected);
    }

    #[test_case("http://localhost", "http://localhost/files" ; "bare host")]
    #[test_case("https://api.example.com/dev/", "https://api.example.com/dev/files" ; "stage")]
    fn files_url(base: &str, expected: &str) {
        // Arrange
        let e = Endpoint::new(base).unwrap();

        // Act
        let url = e.files();

        // Assert
        assert_eq!(url.as_str(), expected);
    }
}
