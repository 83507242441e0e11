//! Array-backed binary heap parameterized by a comparator.
//!
//! `std::collections::BinaryHeap` orders by `Ord`; the batch merger needs
//! to order batches by their range start without imposing a total order on
//! the batch type itself, so this heap takes the comparator as a value.
//! The element for which the comparator returns `Less` surfaces first.

use std::cmp::Ordering;

pub struct Heap<T, F>
where
	F: Fn(&T, &T) -> Ordering,
{
	items: Vec<T>,
	cmp: F,
}

impl<T, F> Heap<T, F>
where
	F: Fn(&T, &T) -> Ordering,
{
	pub fn new(cmp: F) -> Self {
		Heap {
			items: Vec::new(),
			cmp,
		}
	}

	/// Replaces the heap contents, heapifying in O(n).
	pub fn init(&mut self, items: Vec<T>) {
		self.items = items;
		for i in (0..self.items.len() / 2).rev() {
			self.sift_down(i);
		}
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn peek(&self) -> Option<&T> {
		self.items.first()
	}

	pub fn push(&mut self, item: T) {
		self.items.push(item);
		self.sift_up(self.items.len() - 1);
	}

	pub fn pop(&mut self) -> Option<T> {
		if self.items.is_empty() {
			return None;
		}
		let last = self.items.len() - 1;
		self.items.swap(0, last);
		let top = self.items.pop();
		if !self.items.is_empty() {
			self.sift_down(0);
		}
		top
	}

	fn sift_up(&mut self, mut i: usize) {
		while i > 0 {
			let parent = (i - 1) / 2;
			if (self.cmp)(&self.items[i], &self.items[parent]) == Ordering::Less {
				self.items.swap(i, parent);
				i = parent;
			} else {
				break;
			}
		}
	}

	fn sift_down(&mut self, mut i: usize) {
		let len = self.items.len();
		loop {
			let left = 2 * i + 1;
			let right = 2 * i + 2;
			let mut smallest = i;
			if left < len && (self.cmp)(&self.items[left], &self.items[smallest]) == Ordering::Less
			{
				smallest = left;
			}
			if right < len
				&& (self.cmp)(&self.items[right], &self.items[smallest]) == Ordering::Less
			{
				smallest = right;
			}
			if smallest == i {
				break;
			}
			self.items.swap(i, smallest);
			i = smallest;
		}
	}
}
