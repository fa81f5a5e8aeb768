pub(crate) trait StringExt {
    fn trim_in_place(&mut self);
}

impl StringExt for String {
    fn trim_in_place(&mut self) {
        self.truncate(self.trim_end().len());

        let start = self.len() - self.trim_start().len();
        if start > 0 {
            self.drain(..start);
        }
    }
}

pub(crate) trait StrExt {
    fn starts_with_ignore_case(&self, start: &str) -> bool;

    fn contains_ignore_case(&self, needle: &str) -> bool;
}

impl StrExt for str {
    fn starts_with_ignore_case(&self, start: &str) -> bool {
        self.get(..start.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(start))
    }

    fn contains_ignore_case(&self, needle: &str) -> bool {
        self.to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}
