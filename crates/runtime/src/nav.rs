use url::Url;

/// How the executor should record a location change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationChange {
    Push,
    Replace,
}

/// Visited urls with a cursor, like a browser tab's session history.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<Url>,
    index: usize,
}

impl History {
    pub fn new(url: Url) -> Self {
        Self {
            entries: vec![url],
            index: 0,
        }
    }

    pub fn current(&self) -> &Url {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Record a new entry, dropping the forward branch.
    pub fn push(&mut self, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }

    pub fn replace(&mut self, url: Url) {
        self.entries[self.index] = url;
    }

    /// Move the cursor by `delta` entries. Out-of-range moves do nothing.
    pub fn go(&mut self, delta: isize) -> Option<&Url> {
        let target = self.index.checked_add_signed(delta)?;
        if target >= self.entries.len() || delta == 0 {
            return None;
        }
        self.index = target;
        Some(self.current())
    }

    /// Follow a location change the host made on its own (e.g. the back button).
    pub fn sync(&mut self, url: &Url) {
        if self.current() == url {
            return;
        }
        if self.index > 0 && &self.entries[self.index - 1] == url {
            self.index -= 1;
        } else if self.entries.get(self.index + 1) == Some(url) {
            self.index += 1;
        } else {
            self.push(url.clone());
        }
    }

    pub fn resolve(&self, href: &str) -> Result<Url, url::ParseError> {
        self.current().join(href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://app.test/").unwrap().join(path).unwrap()
    }

    #[test]
    fn push_truncates_the_forward_branch() {
        let mut history = History::new(url("/"));
        history.push(url("/a"));
        history.push(url("/b"));
        assert_eq!(history.go(-2), Some(&url("/")));
        history.push(url("/c"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), &url("/c"));
        assert_eq!(history.go(1), None);
    }

    #[test]
    fn go_stays_in_range() {
        let mut history = History::new(url("/"));
        history.push(url("/a"));
        assert_eq!(history.go(-5), None);
        assert_eq!(history.go(3), None);
        assert_eq!(history.index(), 1);
        assert_eq!(history.go(-1), Some(&url("/")));
        assert_eq!(history.go(1), Some(&url("/a")));
    }

    #[test]
    fn sync_follows_host_traversal() {
        let mut history = History::new(url("/"));
        history.push(url("/a"));
        history.sync(&url("/"));
        assert_eq!(history.index(), 0);
        history.sync(&url("/a"));
        assert_eq!(history.index(), 1);
        history.sync(&url("/z"));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn relative_hrefs_resolve_against_the_current_entry() {
        let history = History::new(url("/items/7"));
        assert_eq!(history.resolve("8").unwrap(), url("/items/8"));
        assert_eq!(history.resolve("/about").unwrap(), url("/about"));
    }
}
