use std::num::NonZeroUsize;

/// Split `items` into store-sized chunks.
///
/// Lazy; every chunk except possibly the last has exactly `size` elements,
/// concatenation equals the input, and an empty input yields no chunks. The
/// store's bulk-call ceiling (500 in production) comes in through the engine
/// configuration.
pub fn chunks<T>(items: &[T], size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn concatenation_equals_input() {
        let items: Vec<u32> = (0..1_200).collect();
        let rejoined: Vec<u32> = chunks(&items, size(500)).flatten().copied().collect();
        assert_eq!(rejoined, items);
    }

    #[test]
    fn all_but_last_chunk_are_full() {
        let items: Vec<u32> = (0..1_200).collect();
        let lens: Vec<usize> = chunks(&items, size(500)).map(<[u32]>::len).collect();
        assert_eq!(lens, vec![500, 500, 200]);
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let items: Vec<u32> = (0..1_000).collect();
        let lens: Vec<usize> = chunks(&items, size(500)).map(<[u32]>::len).collect();
        assert_eq!(lens, vec![500, 500]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(chunks(&items, size(500)).count(), 0);
    }
}
