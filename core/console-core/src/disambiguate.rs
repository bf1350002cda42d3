//! Title disambiguation for records that share a display name.
//!
//! The same address commonly appears once per phase or class. Adjacent
//! records with equal display text get the class appended to their title.
//! Only neighbouring pairs are compared, so three-way collisions are labelled
//! pairwise; callers never see more than two phases per address in practice.

/// A record that can be titled by display text and class.
pub trait Labeled {
    fn display_text(&self) -> &str;
    fn class_label(&self) -> String;
    fn set_title(&mut self, title: String);
}

/// Stable ascending sort by display text, case-sensitive.
pub fn sort_by_display_text<T: Labeled>(records: &mut [T]) {
    records.sort_by(|left, right| left.display_text().cmp(right.display_text()));
}

/// Assigns titles to records already sorted by display text.
pub fn disambiguate<T: Labeled>(records: &mut [T]) {
    let Some(first) = records.first_mut() else {
        return;
    };
    let title = first.display_text().to_string();
    first.set_title(title);

    for i in 1..records.len() {
        let (head, tail) = records.split_at_mut(i);
        let previous = &mut head[i - 1];
        let current = &mut tail[0];
        if current.display_text() == previous.display_text() {
            let previous_title = annotated(previous);
            previous.set_title(previous_title);
            let current_title = annotated(current);
            current.set_title(current_title);
        } else {
            let title = current.display_text().to_string();
            current.set_title(title);
        }
    }
}

fn annotated<T: Labeled>(record: &T) -> String {
    format!("{} ({})", record.display_text(), record.class_label())
}
