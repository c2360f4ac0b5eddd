//! 上游字段变化通知.
//!
//! 约定很薄: 每个上游字段用一个 [`FieldTag`] 标识, 调用方在字段
//! 内容变化后向 [`ChangeBus`] 报号, 总线把所有订阅了该号的
//! [`StaleFlag`] 置位. operator 在下一次读取前检查并消费该标志,
//! 把自己的 cache 置为无效. 整个机制单线程, 无锁.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// 上游字段的标识号, 由调用方自行分配并保证唯一.
pub type FieldTag = u32;

/// 单个 operator 的 "上游已变" 标志.
///
/// 总线一侧只持有 `Weak` 引用, operator 被析构后对应条目在下一次
/// 通知时自然失效.
#[derive(Clone, Debug)]
pub struct StaleFlag(Rc<Cell<bool>>);

impl StaleFlag {
    /// 新建未置位的标志.
    pub fn new() -> Self {
        StaleFlag(Rc::new(Cell::new(false)))
    }

    /// 读取并清除标志.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    fn downgrade(&self) -> Weak<Cell<bool>> {
        Rc::downgrade(&self.0)
    }
}

impl Default for StaleFlag {
    fn default() -> Self {
        StaleFlag::new()
    }
}

struct Entry {
    id: u64,
    tags: Vec<FieldTag>,
    flag: Weak<Cell<bool>>,
}

/// 变化通知总线.
///
/// `Clone` 得到的是同一条总线的另一个句柄.
#[derive(Clone, Default)]
pub struct ChangeBus {
    entries: Rc<RefCell<Vec<Entry>>>,
    next_id: Rc<Cell<u64>>,
}

impl ChangeBus {
    /// 新建空总线.
    pub fn new() -> Self {
        ChangeBus::default()
    }

    /// 订阅一组 tag: 其中任一 tag 被通知时置位 `flag`.
    /// 返回的 [`Subscription`] 析构时自动退订.
    pub fn subscribe(&self, tags: &[FieldTag], flag: &StaleFlag) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Entry {
            id,
            tags: tags.to_vec(),
            flag: flag.downgrade(),
        });
        Subscription {
            entries: Rc::downgrade(&self.entries),
            id,
        }
    }

    /// 通知一组字段已变化, 顺带清理已析构的订阅.
    pub fn notify(&self, tags: &[FieldTag]) {
        self.entries.borrow_mut().retain(|entry| {
            let Some(flag) = entry.flag.upgrade() else {
                return false;
            };
            if entry.tags.iter().any(|t| tags.contains(t)) {
                flag.set(true);
            }
            true
        });
    }

    /// 当前存活的订阅数 (含尚未清理的失效条目).
    pub fn subscriber_count(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// 订阅凭据, 析构时退订.
pub struct Subscription {
    entries: Weak<RefCell<Vec<Entry>>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(entries) = self.entries.upgrade() {
            entries.borrow_mut().retain(|entry| entry.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeBus, StaleFlag};

    /// 只有订阅了的 tag 才置位, 且 take 消费标志.
    #[test]
    fn test_notify_sets_subscribed_flags() {
        let bus = ChangeBus::new();
        let a = StaleFlag::new();
        let b = StaleFlag::new();
        let _sa = bus.subscribe(&[1, 2], &a);
        let _sb = bus.subscribe(&[3], &b);

        bus.notify(&[2]);
        assert!(a.take());
        assert!(!a.take());
        assert!(!b.take());

        bus.notify(&[3, 9]);
        assert!(b.take());
    }

    /// 退订后不再接收; 标志被丢弃后条目在通知时被清理.
    #[test]
    fn test_unsubscribe_and_cleanup() {
        let bus = ChangeBus::new();
        let a = StaleFlag::new();
        let sub = bus.subscribe(&[7], &a);
        assert_eq!(bus.subscriber_count(), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        bus.notify(&[7]);
        assert!(!a.take());

        let b = StaleFlag::new();
        let _sb = bus.subscribe(&[7], &b);
        drop(b);
        bus.notify(&[7]);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
