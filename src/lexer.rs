use crate::error::CompileError;
use crate::parser::{Command, Token};

/// The syntax forest produced from a token stream.
///
/// Runs of related commands are folded into one node: `+`/`-` into a net
/// `ChangeValue`, `>`/`<` into a net `ChangePointer`, and `,` or `.` runs into
/// a repeat count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    ChangeValue(i32),
    ChangePointer(i32),
    Get(i32),
    Put(i32),
    /// A `[ ... ]` loop; `offset` is the byte offset of its `[`.
    Loop { offset: usize, body: Vec<Node> },
}

/// Build the syntax forest for a whole program.
pub fn lex<I>(tokens: I) -> Result<Vec<Node>, CompileError>
where
    I: IntoIterator<Item = Token>,
{
    // Enclosing loops: (offset of '[', nodes of the enclosing body so far).
    let mut open: Vec<(usize, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    // Whether the previous token belongs to the same run as the next one.
    let mut last: Option<Command> = None;

    for Token { command, offset } in tokens {
        let overflow = CompileError::Overflow { offset };
        match command {
            Command::Succ | Command::Pred => {
                let delta = if command == Command::Succ { 1 } else { -1 };
                match (last, current.last_mut()) {
                    (Some(Command::Succ | Command::Pred), Some(Node::ChangeValue(total))) => {
                        *total = total.checked_add(delta).ok_or(overflow)?;
                    }
                    _ => current.push(Node::ChangeValue(delta)),
                }
            }
            Command::Next | Command::Prev => {
                let delta = if command == Command::Next { 1 } else { -1 };
                match (last, current.last_mut()) {
                    (Some(Command::Next | Command::Prev), Some(Node::ChangePointer(total))) => {
                        *total = total.checked_add(delta).ok_or(overflow)?;
                    }
                    _ => current.push(Node::ChangePointer(delta)),
                }
            }
            Command::Get => match (last, current.last_mut()) {
                (Some(Command::Get), Some(Node::Get(count))) => {
                    *count = count.checked_add(1).ok_or(overflow)?;
                }
                _ => current.push(Node::Get(1)),
            },
            Command::Put => match (last, current.last_mut()) {
                (Some(Command::Put), Some(Node::Put(count))) => {
                    *count = count.checked_add(1).ok_or(overflow)?;
                }
                _ => current.push(Node::Put(1)),
            },
            Command::Loop => {
                open.push((offset, std::mem::take(&mut current)));
            }
            Command::End => {
                let (start, parent) = open.pop().ok_or(CompileError::UnmatchedClose { offset })?;
                let body = std::mem::replace(&mut current, parent);
                current.push(Node::Loop {
                    offset: start,
                    body,
                });
            }
        }
        last = Some(command);
    }

    match open.pop() {
        Some((offset, _)) => Err(CompileError::UnmatchedOpen { offset }),
        None => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    fn lex_str(source: &str) -> Result<Vec<Node>, CompileError> {
        lex(tokenize(source.as_bytes()))
    }

    #[test]
    fn test_empty() {
        assert_eq!(lex_str(""), Ok(vec![]));
        assert_eq!(lex_str("just a comment"), Ok(vec![]));
    }

    #[test]
    fn test_folds_change_value() {
        assert_eq!(lex_str("+++-"), Ok(vec![Node::ChangeValue(2)]));
        assert_eq!(lex_str("--"), Ok(vec![Node::ChangeValue(-2)]));
    }

    #[test]
    fn test_zero_net_run_kept() {
        assert_eq!(lex_str("+-"), Ok(vec![Node::ChangeValue(0)]));
        assert_eq!(lex_str("><"), Ok(vec![Node::ChangePointer(0)]));
    }

    #[test]
    fn test_folds_change_pointer() {
        assert_eq!(lex_str(">>><"), Ok(vec![Node::ChangePointer(2)]));
    }

    #[test]
    fn test_comments_do_not_split_runs() {
        assert_eq!(lex_str("+ one + two"), Ok(vec![Node::ChangeValue(2)]));
    }

    #[test]
    fn test_io_runs() {
        assert_eq!(
            lex_str(",,,...,"),
            Ok(vec![Node::Get(3), Node::Put(3), Node::Get(1)])
        );
    }

    #[test]
    fn test_runs_split_by_other_commands() {
        assert_eq!(
            lex_str("+>+"),
            Ok(vec![
                Node::ChangeValue(1),
                Node::ChangePointer(1),
                Node::ChangeValue(1)
            ])
        );
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            lex_str("+[-[>]]"),
            Ok(vec![
                Node::ChangeValue(1),
                Node::Loop {
                    offset: 1,
                    body: vec![
                        Node::ChangeValue(-1),
                        Node::Loop {
                            offset: 3,
                            body: vec![Node::ChangePointer(1)],
                        },
                    ],
                },
            ])
        );
    }

    #[test]
    fn test_runs_do_not_cross_loops() {
        assert_eq!(
            lex_str("+[]+"),
            Ok(vec![
                Node::ChangeValue(1),
                Node::Loop {
                    offset: 1,
                    body: vec![]
                },
                Node::ChangeValue(1),
            ])
        );
        assert_eq!(
            lex_str("+[+"),
            Err(CompileError::UnmatchedOpen { offset: 1 })
        );
    }

    #[test]
    fn test_unmatched_close() {
        assert_eq!(
            lex_str("+]"),
            Err(CompileError::UnmatchedClose { offset: 1 })
        );
        assert_eq!(
            lex_str("[]]"),
            Err(CompileError::UnmatchedClose { offset: 2 })
        );
    }

    #[test]
    fn test_unmatched_open() {
        assert_eq!(
            lex_str("[[]"),
            Err(CompileError::UnmatchedOpen { offset: 0 })
        );
    }
}
