use serde::Serialize;

/// Position of one page within a paginated listing.
///
/// Mirrors the forgiving lookup of the blog: a missing or malformed page
/// number gives the first page, one past the end gives the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
}

impl Page {
    pub fn get(count: u64, per_page: u64, requested: Option<&str>) -> Self {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);

        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) => u64::try_from(n)
                .ok()
                .filter(|&n| (1..=num_pages).contains(&n))
                .unwrap_or(num_pages),
            Some(Err(_)) | None => 1,
        };

        Self {
            number,
            num_pages,
            per_page,
            count,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page_number: (number > 1).then(|| number - 1),
            next_page_number: (number < num_pages).then(|| number + 1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    /// 1-based index of the first item on this page, 0 for an empty listing.
    pub fn start_index(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.offset() + 1
        }
    }
}
