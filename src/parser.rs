/// A source command. Every byte that is not one of the eight command
/// characters is a comment and produces no token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Succ,
    Pred,
    Next,
    Prev,
    Get,
    Put,
    Loop,
    End,
}

/// A command together with its byte offset in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub command: Command,
    pub offset: usize,
}

const PLUS: u8 = b'+';
const MINUS: u8 = b'-';
const GREATER: u8 = b'>';
const LESS: u8 = b'<';
const COMMA: u8 = b',';
const DOT: u8 = b'.';
const LBRACKET: u8 = b'[';
const RBRACKET: u8 = b']';

pub fn command_for(byte: u8) -> Option<Command> {
    match byte {
        PLUS => Some(Command::Succ),
        MINUS => Some(Command::Pred),
        GREATER => Some(Command::Next),
        LESS => Some(Command::Prev),
        COMMA => Some(Command::Get),
        DOT => Some(Command::Put),
        LBRACKET => Some(Command::Loop),
        RBRACKET => Some(Command::End),
        _ => None,
    }
}

/// Lazily tokenize source text, skipping comments.
pub fn tokenize(source: &[u8]) -> impl Iterator<Item = Token> + '_ {
    source
        .iter()
        .enumerate()
        .filter_map(|(offset, &byte)| command_for(byte).map(|command| Token { command, offset }))
}
