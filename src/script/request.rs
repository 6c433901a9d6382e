//! The request/response protocol.
//!
//! Every suspension point in the engine yields a [`Request`] describing
//! the decision it needs. The caller answers with a [`Response`], which
//! is validated against the request before the computation resumes. A
//! mismatched or out-of-range response is a
//! [`ProtocolError`](crate::error::ProtocolError), never a silent
//! default.
//!
//! Requests also know how to enumerate every structurally valid
//! response, which is what the legality search branches over.

use serde::{Deserialize, Serialize};

use crate::core::{CardId, PlayerId};
use crate::error::ProtocolError;

/// A decision the engine needs before it can continue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Pick between `min` and `max` cards from the candidates.
    ChooseCards {
        chooser: PlayerId,
        candidates: Vec<CardId>,
        min: usize,
        max: usize,
    },
    /// Pick one player.
    ChoosePlayer {
        chooser: PlayerId,
        candidates: Vec<PlayerId>,
    },
    /// Put the items in an order of the chooser's liking.
    ChooseOrder {
        chooser: PlayerId,
        items: Vec<CardId>,
    },
    /// Yes/no confirmation, typically for an optional interception.
    Confirm {
        chooser: PlayerId,
        subject: Option<CardId>,
    },
}

/// The answer to a [`Request`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Cards(Vec<CardId>),
    Player(PlayerId),
    /// Indexes into the request's `items`, in the chosen order.
    Order(Vec<usize>),
    Confirm(bool),
}

impl Request {
    /// Who has to answer this request.
    #[must_use]
    pub fn chooser(&self) -> PlayerId {
        match self {
            Request::ChooseCards { chooser, .. }
            | Request::ChoosePlayer { chooser, .. }
            | Request::ChooseOrder { chooser, .. }
            | Request::Confirm { chooser, .. } => *chooser,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Request::ChooseCards { .. } => "choose-cards",
            Request::ChoosePlayer { .. } => "choose-player",
            Request::ChooseOrder { .. } => "choose-order",
            Request::Confirm { .. } => "confirm",
        }
    }

    /// Check a response against this request.
    pub fn validate(&self, response: &Response) -> Result<(), ProtocolError> {
        match (self, response) {
            (
                Request::ChooseCards {
                    candidates,
                    min,
                    max,
                    ..
                },
                Response::Cards(chosen),
            ) => {
                if chosen.len() < *min || chosen.len() > *max {
                    return Err(ProtocolError::ChoiceCountOutOfRange {
                        min: *min,
                        max: *max,
                        got: chosen.len(),
                    });
                }
                for (i, card) in chosen.iter().enumerate() {
                    if !candidates.contains(card) || chosen[..i].contains(card) {
                        return Err(ProtocolError::ChoiceNotOffered);
                    }
                }
                Ok(())
            }
            (Request::ChoosePlayer { candidates, .. }, Response::Player(player)) => {
                if candidates.contains(player) {
                    Ok(())
                } else {
                    Err(ProtocolError::ChoiceNotOffered)
                }
            }
            (Request::ChooseOrder { items, .. }, Response::Order(order)) => {
                if order.len() != items.len() {
                    return Err(ProtocolError::NotAPermutation);
                }
                let mut seen = vec![false; items.len()];
                for &i in order {
                    if i >= items.len() || seen[i] {
                        return Err(ProtocolError::NotAPermutation);
                    }
                    seen[i] = true;
                }
                Ok(())
            }
            (Request::Confirm { .. }, Response::Confirm(_)) => Ok(()),
            (request, response) => Err(ProtocolError::WrongResponseKind {
                expected: request.kind_name(),
                got: match response {
                    Response::Cards(_) => "cards",
                    Response::Player(_) => "player",
                    Response::Order(_) => "order",
                    Response::Confirm(_) => "confirm",
                },
            }),
        }
    }

    /// When the request admits exactly one valid answer, return it.
    ///
    /// The engine resolves forced choices itself instead of asking.
    #[must_use]
    pub fn forced_response(&self) -> Option<Response> {
        match self {
            Request::ChooseCards {
                candidates,
                min,
                max,
                ..
            } => {
                if min == max && *min == candidates.len() {
                    Some(Response::Cards(candidates.clone()))
                } else {
                    None
                }
            }
            Request::ChoosePlayer { candidates, .. } => {
                if candidates.len() == 1 {
                    Some(Response::Player(candidates[0]))
                } else {
                    None
                }
            }
            Request::ChooseOrder { items, .. } => {
                if items.len() <= 1 {
                    Some(Response::Order((0..items.len()).collect()))
                } else {
                    None
                }
            }
            Request::Confirm { .. } => None,
        }
    }

    /// Every structurally valid response, in a deterministic order.
    ///
    /// The legality search branches over this set.
    #[must_use]
    pub fn enumerate_responses(&self) -> Vec<Response> {
        match self {
            Request::ChooseCards {
                candidates,
                min,
                max,
                ..
            } => {
                let mut out = Vec::new();
                let max = (*max).min(candidates.len());
                for size in *min..=max {
                    subsets_of(candidates, size, &mut out);
                }
                out
            }
            Request::ChoosePlayer { candidates, .. } => {
                candidates.iter().map(|&p| Response::Player(p)).collect()
            }
            Request::ChooseOrder { items, .. } => {
                let mut out = Vec::new();
                let mut order: Vec<usize> = (0..items.len()).collect();
                permutations(&mut order, 0, &mut out);
                out
            }
            Request::Confirm { .. } => vec![Response::Confirm(true), Response::Confirm(false)],
        }
    }
}

fn subsets_of(candidates: &[CardId], size: usize, out: &mut Vec<Response>) {
    fn recurse(
        candidates: &[CardId],
        size: usize,
        start: usize,
        chosen: &mut Vec<CardId>,
        out: &mut Vec<Response>,
    ) {
        if chosen.len() == size {
            out.push(Response::Cards(chosen.clone()));
            return;
        }
        for i in start..candidates.len() {
            chosen.push(candidates[i]);
            recurse(candidates, size, i + 1, chosen, out);
            chosen.pop();
        }
    }
    recurse(candidates, size, 0, &mut Vec::new(), out);
}

fn permutations(order: &mut Vec<usize>, at: usize, out: &mut Vec<Response>) {
    if at == order.len() {
        out.push(Response::Order(order.clone()));
        return;
    }
    for i in at..order.len() {
        order.swap(at, i);
        permutations(order, at + 1, out);
        order.swap(at, i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(ids: &[u32]) -> Vec<CardId> {
        ids.iter().map(|&i| CardId::new(i)).collect()
    }

    #[test]
    fn test_validate_card_choice_bounds() {
        let request = Request::ChooseCards {
            chooser: PlayerId::new(0),
            candidates: cards(&[1, 2, 3]),
            min: 1,
            max: 2,
        };

        assert!(request.validate(&Response::Cards(cards(&[2]))).is_ok());
        assert_eq!(
            request.validate(&Response::Cards(cards(&[1, 2, 3]))),
            Err(ProtocolError::ChoiceCountOutOfRange {
                min: 1,
                max: 2,
                got: 3
            })
        );
        assert_eq!(
            request.validate(&Response::Cards(cards(&[9]))),
            Err(ProtocolError::ChoiceNotOffered)
        );
        assert_eq!(
            request.validate(&Response::Cards(cards(&[1, 1]))),
            Err(ProtocolError::ChoiceNotOffered)
        );
    }

    #[test]
    fn test_validate_wrong_kind() {
        let request = Request::Confirm {
            chooser: PlayerId::new(0),
            subject: None,
        };
        assert_eq!(
            request.validate(&Response::Player(PlayerId::new(0))),
            Err(ProtocolError::WrongResponseKind {
                expected: "confirm",
                got: "player",
            })
        );
    }

    #[test]
    fn test_validate_order_permutation() {
        let request = Request::ChooseOrder {
            chooser: PlayerId::new(0),
            items: cards(&[1, 2, 3]),
        };
        assert!(request.validate(&Response::Order(vec![2, 0, 1])).is_ok());
        assert!(request.validate(&Response::Order(vec![0, 0, 1])).is_err());
        assert!(request.validate(&Response::Order(vec![0, 1])).is_err());
    }

    #[test]
    fn test_forced_single_choice() {
        let request = Request::ChooseCards {
            chooser: PlayerId::new(0),
            candidates: cards(&[7]),
            min: 1,
            max: 1,
        };
        assert_eq!(
            request.forced_response(),
            Some(Response::Cards(cards(&[7])))
        );

        let open = Request::ChooseCards {
            chooser: PlayerId::new(0),
            candidates: cards(&[7, 8]),
            min: 1,
            max: 1,
        };
        assert_eq!(open.forced_response(), None);
    }

    #[test]
    fn test_enumerate_card_subsets() {
        let request = Request::ChooseCards {
            chooser: PlayerId::new(0),
            candidates: cards(&[1, 2]),
            min: 1,
            max: 2,
        };
        let responses = request.enumerate_responses();
        assert_eq!(
            responses,
            vec![
                Response::Cards(cards(&[1])),
                Response::Cards(cards(&[2])),
                Response::Cards(cards(&[1, 2])),
            ]
        );
    }

    #[test]
    fn test_enumerate_orders() {
        let request = Request::ChooseOrder {
            chooser: PlayerId::new(0),
            items: cards(&[1, 2, 3]),
        };
        assert_eq!(request.enumerate_responses().len(), 6);
    }
}
