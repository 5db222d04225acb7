//! 线程安全的结果队列
//!
//! 探测任务（多个生产者）与控制器（唯一消费者）之间唯一的交接点。
//! 所有修改操作由同一把互斥锁保护，消费者在条件变量上等待新元素。

use crate::error::QueueError;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// 无界FIFO队列
///
/// 出队顺序与入队顺序一致，`len()` 恒等于已入队数减去已出队数。
#[derive(Debug)]
pub struct ResultQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> ResultQueue<T> {
    /// 创建空队列
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // 持锁期间不会出现中途失败的修改，锁中毒后数据仍然一致
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 追加到队尾，并唤醒一个等待中的消费者
    ///
    /// 队列关闭后返回 [`QueueError::Closed`]。
    pub fn enqueue(&self, item: T) -> Result<(), QueueError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
        Ok(())
    }

    /// 阻塞直到有元素可用，取出最早入队的元素
    ///
    /// 仅当队列已关闭且已取空时返回 [`QueueError::Closed`]。
    pub fn dequeue(&self) -> Result<T, QueueError> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            if state.closed {
                return Err(QueueError::Closed);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 非阻塞出队，队列为空时返回 [`QueueError::Empty`]
    pub fn try_dequeue(&self) -> Result<T, QueueError> {
        self.lock().items.pop_front().ok_or(QueueError::Empty)
    }

    /// 当前元素个数
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// 关闭队列并唤醒所有等待者，已入队的元素仍可取出
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }
}

impl<T: Clone> ResultQueue<T> {
    /// 查看队首元素但不移除
    pub fn peek(&self) -> Option<T> {
        self.lock().items.front().cloned()
    }
}

impl<T> Default for ResultQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
