use bitflags::bitflags;

bitflags! {
    /// Modifiers applied while a pattern is parsed and compiled.
    ///
    /// The C heritage flags selecting the *pattern* encoding and the
    /// pre-built-AST input path are not needed here: patterns are `&str`,
    /// and [`LexerBuilder::define_pattern`](crate::lexer::LexerBuilder::define_pattern)
    /// accepts an AST value directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompileFlags: u32 {
        /// Treat `^ $ \< \>` as ordinary characters.
        const NOANCHORS = 1 << 0;
        /// Compile every group as non-capturing.
        const NOREF = 1 << 1;
        /// Force the whole pattern non-greedy.
        const NONGREEDY = 1 << 2;
        /// Recover from soft parse errors and keep the best-effort AST.
        const NOERRORS = 1 << 3;
        /// Fold character-class members case-insensitively.
        const INSENSITIVE = 1 << 4;
        /// The input is a literal string, not a regex; bypass the parser.
        const STATIC = 1 << 5;
    }
}

bitflags! {
    /// Modifiers applied while a prepared table scans input.
    ///
    /// The input *encoding* is selected by the haystack type (see
    /// [`EncodedStr`](crate::encoding::EncodedStr)), not by a flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RunFlags: u32 {
        /// Skip anchor verification at acceptance.
        const NOANCHORS = 1 << 0;
        /// Skip capture-slot updates.
        const NOREF = 1 << 1;
        /// Stop at the first accepting state instead of the longest match.
        const NONGREEDY = 1 << 2;
        /// Emit a step-by-step scan trace through the `log` facade.
        const DEBUG = 1 << 3;
    }
}

bitflags! {
    /// Per-pattern match conditions, recorded on the AST root, carried to
    /// the accepting automaton states and persisted in table row column 2.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MatchFlags: u32 {
        /// `^` — the match must start at input origin or after a newline.
        const BOL = 1 << 0;
        /// `$` — the match must end at end of input or before a newline.
        const EOL = 1 << 1;
        /// `\<` — the match must not be preceded by a word character.
        const BOW = 1 << 2;
        /// `\>` — the match must not be followed by a word character.
        const EOW = 1 << 3;
        /// The pattern was compiled non-greedy.
        const NONGREEDY = 1 << 4;
    }
}

impl MatchFlags {
    /// The anchor subset of the flags.
    pub fn anchors(self) -> MatchFlags {
        self & (MatchFlags::BOL | MatchFlags::EOL | MatchFlags::BOW | MatchFlags::EOW)
    }
}
