// Copyright (c) 2019-present Vesper Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Monte-Carlo tree node for decision search.
//!
//! A node tracks its prior probability, its visit count and the sum of rewards
//! observed through it; the node value is the mean reward. Child selection
//! uses an upper confidence bound that trades the value estimate against the
//! prior-weighted exploration term. How rewards are produced (rollouts, a
//! learned predictor) is up to the host.

/// See module docs.
#[derive(Clone, Debug, Default)]
pub struct MonteCarloNode<A> {
    /// The action that led to this node.
    pub action: A,
    /// Prior probability assigned by the host when the node was expanded.
    pub prior: f32,
    visits: u32,
    reward_sum: f32,
    children: Vec<MonteCarloNode<A>>,
}

impl<A> MonteCarloNode<A> {
    pub fn new(action: A, prior: f32) -> Self {
        Self {
            action,
            prior,
            visits: 0,
            reward_sum: 0.0,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits
    }

    /// Mean reward observed through this node; zero before the first visit.
    #[inline]
    pub fn value(&self) -> f32 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward_sum / self.visits as f32
        }
    }

    /// Records one observed reward.
    pub fn record(&mut self, reward: f32) {
        self.visits += 1;
        self.reward_sum += reward;
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[MonteCarloNode<A>] {
        &self.children
    }

    /// Expands the node with one child per (action, prior) pair.
    pub fn expand<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = (A, f32)>,
    {
        self.children = actions
            .into_iter()
            .map(|(action, prior)| MonteCarloNode::new(action, prior))
            .collect();
    }

    /// Upper confidence bound of a child as seen from this node.
    fn ucb(&self, child: &MonteCarloNode<A>, exploration: f32) -> f32 {
        child.value()
            + exploration * child.prior * (self.visits.max(1) as f32).sqrt()
                / (1.0 + child.visits as f32)
    }

    /// Index of the child with the highest upper confidence bound.
    pub fn select_child(&self, exploration: f32) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                self.ucb(a, exploration).total_cmp(&self.ucb(b, exploration))
            })
            .map(|(index, _)| index)
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut MonteCarloNode<A>> {
        self.children.get_mut(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn value_is_mean_reward() {
        let mut node = MonteCarloNode::new((), 1.0);
        assert_eq!(node.value(), 0.0);
        node.record(1.0);
        node.record(0.0);
        assert_eq!(node.value(), 0.5);
        assert_eq!(node.visits(), 2);
    }

    #[test]
    fn unvisited_children_are_explored_by_prior() {
        let mut root = MonteCarloNode::new("root", 1.0);
        root.expand([("low", 0.1), ("high", 0.9)]);
        root.record(0.0);

        // With equal (zero) values the prior decides.
        let selected = root.select_child(1.0).unwrap();
        assert_eq!(root.children()[selected].action, "high");
    }

    #[test]
    fn exploitation_wins_once_value_dominates() {
        let mut root = MonteCarloNode::new("root", 1.0);
        root.expand([("a", 0.5), ("b", 0.5)]);
        for _ in 0..100 {
            root.record(1.0);
        }
        // Child a has seen consistently high rewards.
        for _ in 0..50 {
            root.child_mut(0).unwrap().record(1.0);
        }
        // Child b was tried a few times with no reward.
        for _ in 0..50 {
            root.child_mut(1).unwrap().record(0.0);
        }

        let selected = root.select_child(0.1).unwrap();
        assert_eq!(root.children()[selected].action, "a");
    }
}
