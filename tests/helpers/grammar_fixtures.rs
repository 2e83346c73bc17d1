//! Grammar sources used across tests.

/// Assignment grammar with a left-recursive expression rule
pub const EXPR: &str = "grammar Expr;
stat : ID '=' expr ';' ;
expr : expr ('*'|'/') expr
     | expr '+' expr
     | INT
     | ID
     ;
EQ : '=' ;
ID : [a-z]+ ;
INT : [0-9]+ ;
WS : [ \\t\\r\\n]+ -> skip ;
";

/// Calculator as one combined grammar
pub const CALC: &str = "grammar Calc;
prog : stat+ EOF ;
stat : ID '=' expr ';' ;
expr : expr ('*'|'/') expr
     | expr ('+'|'-') expr
     | '(' expr ')'
     | INT
     | ID
     ;
EQ : '=' ;
SEMI : ';' ;
MUL : '*' ;
DIV : '/' ;
ADD : '+' ;
SUB : '-' ;
LP : '(' ;
RP : ')' ;
ID : [a-z]+ ;
INT : [0-9]+ ;
COMMENT : '#' [a-z]* -> channel(HIDDEN) ;
WS : [ \\t\\r\\n]+ -> skip ;
";

/// Lexer half of the calculator split in two files
pub const CALC_LEXER: &str = "lexer grammar CalcLexer;
EQ : '=' ;
SEMI : ';' ;
MUL : '*' ;
DIV : '/' ;
ADD : '+' ;
SUB : '-' ;
LP : '(' ;
RP : ')' ;
ID : [a-z]+ ;
INT : [0-9]+ ;
COMMENT : '#' [a-z]* -> channel(HIDDEN) ;
WS : [ \\t\\r\\n]+ -> skip ;
";

/// Parser half of the calculator split in two files
pub const CALC_PARSER: &str = "parser grammar CalcParser;
options { tokenVocab=CalcLexer; }
prog : stat+ EOF ;
stat : ID '=' expr ';' ;
expr : expr ('*'|'/') expr
     | expr ('+'|'-') expr
     | '(' expr ')'
     | INT
     | ID
     ;
";

/// Grammar text with a syntax error (the rule is never terminated)
pub fn broken(name: &str) -> String {
    format!("grammar {name};\nstat : ID '=' \n")
}
