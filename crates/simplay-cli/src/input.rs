//! Keyboard input modes and the command line buffer.


/// Current input mode of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum InputMode {
    /// Keys act as shortcuts.
    #[default]
    Normal,

    /// Typing a slash command.
    Command,
}


/// Text buffer with a cursor, for the command line.
#[derive( Debug, Default )]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}


impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }


    /// Inserts a character at the cursor position.
    pub fn insert( &mut self, c: char ) {
        self.content.insert( self.cursor, c );
        self.cursor += c.len_utf8();
    }


    /// Deletes the character before the cursor.
    pub fn backspace( &mut self ) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.content.remove( prev );
            self.cursor = prev;
        }
    }


    /// Deletes the character at the cursor position.
    pub fn delete( &mut self ) {
        if self.cursor < self.content.len() {
            self.content.remove( self.cursor );
        }
    }


    pub fn clear( &mut self ) {
        self.content.clear();
        self.cursor = 0;
    }


    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Cursor position in characters, for placing the terminal cursor.
    pub fn cursor_char_pos( &self ) -> usize {
        self.content[ ..self.cursor ].chars().count()
    }


    pub fn move_left( &mut self ) {
        if self.cursor > 0 {
            self.cursor = self.prev_boundary();
        }
    }


    pub fn move_right( &mut self ) {
        if let Some( c ) = self.content[ self.cursor.. ].chars().next() {
            self.cursor += c.len_utf8();
        }
    }


    pub fn move_home( &mut self ) {
        self.cursor = 0;
    }


    pub fn move_end( &mut self ) {
        self.cursor = self.content.len();
    }


    pub fn is_empty( &self ) -> bool {
        self.content.is_empty()
    }


    fn prev_boundary( &self ) -> usize {
        self.content[ ..self.cursor ]
            .char_indices()
            .last()
            .map( |( i, _ )| i )
            .unwrap_or( 0 )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_insert_and_backspace_multibyte() {
        let mut input = InputBuffer::new();
        for c in "cd Björk".chars() {
            input.insert( c );
        }
        assert_eq!( input.cursor_char_pos(), 8 );

        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!( input.content(), "cd Bjrk" );
        assert_eq!( input.cursor_char_pos(), 5 );
    }


    #[test]
    fn test_delete_and_home_end() {
        let mut input = InputBuffer::new();
        for c in "next".chars() {
            input.insert( c );
        }
        input.move_home();
        input.delete();
        assert_eq!( input.content(), "ext" );

        input.move_end();
        input.move_right();
        input.insert( '!' );
        assert_eq!( input.content(), "ext!" );

        input.clear();
        assert!( input.is_empty() );
    }
}
