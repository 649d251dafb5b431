/// One paginated window over a remote collection
#[derive(Debug, Clone)]
pub struct CollectionPage<T> {
    href: String,
    offset: i64,
    limit: i64,
    size: i64,
    items: Vec<T>,
}

impl<T> CollectionPage<T> {
    pub fn new(href: String, offset: i64, limit: i64, size: i64, items: Vec<T>) -> Self {
        Self {
            href,
            offset,
            limit,
            size,
            items,
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Total size of the remote collection
    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Offset of the following page, if there is one
    pub fn next_offset(&self) -> Option<i64> {
        let next = self.offset + self.items.len() as i64;
        (next < self.size && !self.items.is_empty()).then_some(next)
    }
}

impl<'a, T> IntoIterator for &'a CollectionPage<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
