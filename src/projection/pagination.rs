//! ページ分割

/// 1ページあたりの既定件数
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// 1始まりのページ番号で切り出す
///
/// 範囲外やページ0、サイズ0は空を返す。
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());
    &items[start..end]
}

/// `ceil(len / page_size)`
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// 現在ページの追跡
///
/// 範囲外への移動は無視する（エラーにはしない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: usize,
    page_size: usize,
    total_items: usize,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
            total_items: 0,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_items, self.page_size)
    }

    /// 一覧の件数を更新（現在ページが範囲外になった場合は1へ戻す）
    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        if self.page > self.total_pages().max(1) {
            self.page = 1;
        }
    }

    /// 指定ページへ移動。範囲外なら何もせず`false`
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            tracing::debug!(page, total_pages = self.total_pages(), "📄 Ignoring out-of-range page");
            return false;
        }
        self.page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.page.saturating_sub(1))
    }

    /// タブ切り替え時などに1ページ目へ戻す
    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        paginate(items, self.page, self.page_size)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
