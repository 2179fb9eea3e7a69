//! Property-based tests for track advancement.

use proptest::prelude::*;
use simplay_core::{ Advance, Listing, PlayerState };


fn state_with( len: usize, current: usize ) -> PlayerState {
    let mut state = PlayerState::new( "/music" );
    let request = state.begin_directory( "/music" );
    let tracks = ( 0..len ).map( |i| format!( "{:02}.mp3", i ) ).collect();
    state.apply_listing( request.generation, Listing { tracks, directories: Vec::new() } );
    state.select( current );
    state
}


fn step( state: &mut PlayerState ) -> usize {
    match state.next_index() {
        Advance::To( idx ) => {
            state.select( idx );
            idx
        }
        other => panic!( "expected to advance, got {:?}", other ),
    }
}


fn track_and_index() -> impl Strategy<Value = ( usize, usize )> {
    ( 1usize..40 ).prop_flat_map( |len| ( Just( len ), 0..len ) )
}


proptest! {
    /// N advances over N tracks come back to the start.
    #[test]
    fn next_is_cyclic( ( len, start ) in track_and_index() ) {
        let mut state = state_with( len, start );
        for _ in 0..len {
            step( &mut state );
        }
        prop_assert_eq!( state.current(), Some( start ) );
    }


    /// Once every index failed, advancing changes nothing.
    #[test]
    fn all_failed_halts( len in 1usize..40 ) {
        let mut state = state_with( len, 0 );
        for i in 0..len {
            state.select( i );
            state.mark_error();
        }
        state.select( len - 1 );
        prop_assert_eq!( state.errors().len(), len );

        prop_assert_eq!( state.next_index(), Advance::Halted );
        prop_assert_eq!( state.current(), Some( len - 1 ) );
    }


    /// Previous then next (and next then previous) is the identity.
    #[test]
    fn previous_and_next_are_inverse( ( len, start ) in track_and_index() ) {
        let mut state = state_with( len, start );
        let prev = state.previous_index().unwrap();
        state.select( prev );
        step( &mut state );
        prop_assert_eq!( state.current(), Some( start ) );

        step( &mut state );
        let prev = state.previous_index().unwrap();
        state.select( prev );
        prop_assert_eq!( state.current(), Some( start ) );
    }


    /// A directory change empties the error set and the selection.
    #[test]
    fn directory_change_resets( ( len, start ) in track_and_index(), failed in 0usize..40 ) {
        let mut state = state_with( len, start );
        for i in 0..failed.min( len ) {
            state.select( i );
            state.mark_error();
        }

        let request = state.begin_directory( "/music/other" );
        prop_assert!( state.errors().is_empty() );
        prop_assert_eq!( state.current(), None );

        let selected = state.apply_listing( request.generation, Listing::default() );
        prop_assert_eq!( selected, None );
        prop_assert_eq!( state.current(), None );
    }
}
