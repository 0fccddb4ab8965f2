/*
 * patterns.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive patterns.
//!
//! All patterns are case-insensitive and let `.` cross newlines. Argument
//! captures are lazy, so an argument ends at the first `)`: `@if(count($x))`
//! captures `count($x`. Conditions that need parentheses have to be written
//! without them or moved into a `@php` block.
//!
//! Directive names are not matched on a word boundary either. A custom
//! directive `year` also rewrites the `@year` prefix of `@yearly`, leaving
//! `ly` behind, so custom names should not prefix other directives.

use once_cell::sync::Lazy;
use regex::Regex;

fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|e| panic!("invalid directive pattern {source:?}: {e}"))
}

macro_rules! patterns {
    ($($name:ident = $source:literal;)*) => {
        $(pub(crate) static $name: Lazy<Regex> = Lazy::new(|| pattern($source));)*
    };
}

patterns! {
    EXTENDS = r"(?is)@extends\((.+?)\)";
    // The key may not contain `,` or `)`, otherwise a block section whose
    // body has a comma in it would be read as an inline section.
    INLINE_SECTION = r"(?is)@section\(([^,)]+),(.+?)\)";
    BLOCK_SECTION = r"(?is)@section\((.+?)\)(.*?)@endsection";
    INCLUDE = r"(?is)@include\((.*?)\)";

    FORM_BLOCK = r"(?is)@form\((.*?)\)(.*?)@endform";
    INPUT = r"(?is)@input\((.*?)\)";
    TEXTAREA = r"(?is)@textarea\((.*?)\)";
    SUBMIT = r"(?is)@submit\((.*?)\)";
    BUTTON = r"(?is)@button\((.*?)\)";
    LABEL = r"(?is)@label\((.*?)\)";
    SELECT = r"(?is)@select\((.*?)\)";

    ENV = r"(?is)@env\((.*?)\)";
    END_ENV = r"(?i)@endenv";

    FOREACH = r"(?is)@foreach\((.*?)\)";
    END_FOREACH = r"(?i)@endforeach";
    FOR = r"(?is)@for\((.*?)\)";
    END_FOR = r"(?i)@endfor";
    WHILE = r"(?is)@while\((.*?)\)";
    END_WHILE = r"(?i)@endwhile";

    CONTINUE_IF = r"(?is)@continue\((.*?)\)";
    BREAK_IF = r"(?is)@break\((.*?)\)";
    CONTINUE = r"(?i)@continue";
    BREAK = r"(?i)@break";

    IF = r"(?is)@if\((.*?)\)";
    ELSE_IF = r"(?is)@elseif\((.*?)\)";
    ELSE = r"(?i)@else";
    END_IF = r"(?i)@endif";

    SWITCH = r"(?is)@switch\((.*?)\)(.*?)@endswitch";
    CASE = r"(?is)@case\((.*?)\)";
    DEFAULT = r"(?i)@default";

    ISSET = r"(?is)@isset\((.*?)\)";
    END_ISSET = r"(?i)@endisset";
    EMPTY = r"(?is)@empty\((.*?)\)";
    END_EMPTY = r"(?i)@endempty";

    CODE_OPEN = r"(?i)@php";
    CODE_CLOSE = r"(?i)@endphp";

    YIELD = r"(?is)@yield\((.*?)\)";
    METHOD = r"(?is)@method\((.*?)\)";

    COMMENT = r"(?s)\{\{--(.*?)--\}\}";
    RAW_ECHO = r"(?s)\{!!(.*?)!!\}";
    ESCAPED_ECHO = r"(?s)\{\{(.*?)\}\}";

    WHITESPACE_RUN = r"\s+";
}

/// Trim whitespace, NUL, vertical tab and both quote styles from both ends.
///
/// Used for names and keys written as `'name'` or `"name"`.
pub(crate) fn unquote(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B' | '"' | '\''))
}
