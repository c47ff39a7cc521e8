use crate::core::block::Header;

/// Append-only list of committed headers, indexed by height.
#[derive(Debug, Default, Clone)]
pub struct HeaderList {
    headers: Vec<Header>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// Header at `height`.
    ///
    /// # Panics
    /// If `height` is above [`HeaderList::height`]. Callers check the height first, so reaching
    /// this means the list and its caller disagree about the chain.
    pub fn get(&self, height: u32) -> &Header {
        match self.headers.get(height as usize) {
            Some(header) => header,
            None => panic!(
                "header index {height} out of range (height {})",
                self.height()
            ),
        }
    }

    /// Header of the chain tip, `None` before genesis is added.
    pub fn tip(&self) -> Option<&Header> {
        self.headers.last()
    }

    /// `len - 1`; zero for an empty list.
    pub fn height(&self) -> u32 {
        self.headers.len().saturating_sub(1) as u32
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hash::Hash;

    fn header(height: u32) -> Header {
        Header {
            version: 1,
            height,
            prev_hash: Hash::zero(),
            root_hash: Hash::zero(),
            timestamp: 0,
        }
    }

    #[test]
    fn height_is_len_minus_one() {
        let mut list = HeaderList::new();
        assert!(list.is_empty());
        assert!(list.tip().is_none());

        for h in 0..5 {
            list.add(header(h));
        }
        assert_eq!(list.len(), 5);
        assert_eq!(list.height(), 4);
        assert_eq!(list.get(2).height, 2);
        assert_eq!(list.tip().map(|h| h.height), Some(4));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_above_height_panics() {
        let mut list = HeaderList::new();
        list.add(header(0));
        list.get(1);
    }
}
